use std::path::{Path, PathBuf};

use crate::types::ValueRange;

/// All error types that can occur when interacting with Key Lights.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The light could not be reached: connection refused, DNS failure or timeout.
    #[error("light {device} is unreachable: {source}")]
    Unreachable {
        device: String,
        #[source]
        source: reqwest::Error,
    },

    /// The light answered, but not with what the Key Light API promises.
    #[error("unexpected response from light {device}: {reason}")]
    Protocol { device: String, reason: String },

    /// No built-in or user-defined preset carries this name.
    #[error("unknown preset {name:?} (available: {available})")]
    UnknownPreset { name: String, available: String },

    /// The configuration file exists but could not be read or parsed.
    #[error("invalid config {}: {reason}", .path.display())]
    Config { path: PathBuf, reason: String },

    /// A value fell outside the device's range under [`crate::RangePolicy::Reject`].
    #[error("{field} {value} is outside the device range {range}")]
    OutOfRange {
        field: &'static str,
        value: i64,
        range: ValueRange,
    },

    /// An effect stopped part-way through for one device.
    #[error("effect aborted on light {device} at step {step}: {source}")]
    Effect {
        device: String,
        step: usize,
        #[source]
        source: Box<Error>,
    },

    /// The mood name is not one of [`crate::Mood`].
    #[error("unknown mood: {0}")]
    UnknownMood(String),

    /// Running the discovery tool failed for a reason other than it being absent.
    #[error("discovery {action} error: {err:?}")]
    Discovery { action: String, err: std::io::Error },
}

impl Error {
    /// Create a new unreachable error
    pub fn unreachable(device: &str, source: reqwest::Error) -> Self {
        Error::Unreachable {
            device: device.to_string(),
            source,
        }
    }

    /// Create a new protocol error
    pub fn protocol(device: &str, reason: impl ToString) -> Self {
        Error::Protocol {
            device: device.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Create a new config error
    pub fn config(path: &Path, reason: impl ToString) -> Self {
        Error::Config {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }

    /// Create a new discovery error
    pub fn discovery(action: &str, err: std::io::Error) -> Self {
        Error::Discovery {
            action: action.to_string(),
            err,
        }
    }

    /// Whether the failure is a network failure, looking through effect failures.
    pub fn is_unreachable(&self) -> bool {
        match self {
            Error::Unreachable { .. } => true,
            Error::Effect { source, .. } => source.is_unreachable(),
            _ => false,
        }
    }
}

/// Hacky implementation of PartialEq for testing
#[cfg(test)]
impl PartialEq for Error {
    fn eq(&self, other: &Self) -> bool {
        self.to_string() == other.to_string()
    }
}
