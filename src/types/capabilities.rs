//! Declared value ranges of one light.

use serde::{Deserialize, Serialize};

use super::ValueRange;

/// The brightness and temperature ranges a light accepts.
///
/// Every Key Light model shares the same ranges, so [`Capabilities::default`]
/// is what discovery and static configuration hand out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    pub brightness: ValueRange,
    pub temperature: ValueRange,
}

impl Capabilities {
    /// Brightness in percent.
    pub const BRIGHTNESS: ValueRange = ValueRange::new(0, 100);
    /// Temperature in the vendor's mired-like scale: 143 is ~7000K, 344 is ~2900K.
    pub const TEMPERATURE: ValueRange = ValueRange::new(143, 344);
}

impl Default for Capabilities {
    fn default() -> Self {
        Capabilities {
            brightness: Self::BRIGHTNESS,
            temperature: Self::TEMPERATURE,
        }
    }
}
