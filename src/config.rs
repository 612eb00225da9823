//! User configuration loaded from TOML.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use log::debug;
use serde::Deserialize;

use crate::device::{DeviceAddress, DeviceInfo};
use crate::errors::Error;
use crate::light::ClientOptions;
use crate::preset::{Preset, PresetValues, builtin_presets};
use crate::types::RangePolicy;

type Result<T> = std::result::Result<T, Error>;

/// A light listed in the config file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LightConfig {
    pub name: String,
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Hardware id, when known. Enables device-id preset overrides.
    #[serde(default)]
    pub id: String,
}

fn default_port() -> u16 {
    DeviceAddress::DEFAULT_PORT
}

impl LightConfig {
    pub fn to_device(&self) -> DeviceInfo {
        DeviceInfo::new(&self.id, &self.name, DeviceAddress::new(&self.host, self.port))
    }
}

/// The `[client]` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClientConfig {
    pub timeout_ms: u64,
    pub max_concurrency: usize,
    pub range_policy: RangePolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            timeout_ms: 5000,
            max_concurrency: 4,
            range_policy: RangePolicy::Clamp,
        }
    }
}

impl ClientConfig {
    pub fn options(&self) -> ClientOptions {
        ClientOptions {
            timeout: Duration::from_millis(self.timeout_ms),
            policy: self.range_policy,
        }
    }

    /// Never less than one.
    pub fn concurrency(&self) -> usize {
        self.max_concurrency.max(1)
    }
}

/// Everything the config file can say, with defaults for what it does not.
///
/// # Example
///
/// ```
/// use elgato_keylight::AppConfig;
///
/// let config: AppConfig = r#"
///     [[lights]]
///     name = "right"
///     host = "192.168.0.60"
///
///     [presets.reading]
///     brightness = 80
///     temperature = 230
/// "#
/// .parse()
/// .unwrap();
///
/// assert_eq!(config.lights[0].port, 9123);
/// assert!(config.preset("reading").is_some());
/// assert!(config.preset("webcam").is_some());
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppConfig {
    pub client: ClientConfig,
    pub lights: Vec<LightConfig>,
    /// User-defined presets only; built-ins are consulted by [`AppConfig::preset`].
    pub presets: BTreeMap<String, Preset>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RawConfig {
    client: ClientConfig,
    lights: Vec<LightConfig>,
    presets: BTreeMap<String, RawPreset>,
}

// Integer keys are preset-level values; table keys are per-device overrides.
#[derive(Debug, Deserialize)]
struct RawPreset {
    brightness: Option<i64>,
    temperature: Option<i64>,
    #[serde(flatten)]
    overrides: BTreeMap<String, PresetValues>,
}

impl From<RawPreset> for Preset {
    fn from(raw: RawPreset) -> Self {
        let defaults = PresetValues {
            brightness: raw.brightness,
            temperature: raw.temperature,
        };
        raw.overrides
            .into_iter()
            .fold(Preset::from_values(defaults), |preset, (key, values)| {
                preset.with_key_override(&key, values)
            })
    }
}

impl FromStr for AppConfig {
    type Err = toml::de::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let raw: RawConfig = toml::from_str(s)?;
        // Fleet results are keyed by device; two lights may not share a key.
        let mut keys = HashSet::new();
        if let Some(dup) = raw
            .lights
            .iter()
            .map(LightConfig::to_device)
            .find(|device| !keys.insert(device.key().to_string()))
        {
            return Err(serde::de::Error::custom(format!(
                "light {:?} is listed twice; give each light a unique name or id",
                dup.key()
            )));
        }
        Ok(AppConfig {
            client: raw.client,
            lights: raw.lights,
            presets: raw
                .presets
                .into_iter()
                .map(|(name, preset)| (name, Preset::from(preset)))
                .collect(),
        })
    }
}

impl AppConfig {
    /// A user preset of this name, else the built-in one.
    pub fn preset(&self, name: &str) -> Option<Preset> {
        self.presets
            .get(name)
            .cloned()
            .or_else(|| builtin_presets().remove(name))
    }

    /// Built-in and user preset names, sorted and deduplicated.
    pub fn preset_names(&self) -> Vec<String> {
        let mut names: Vec<String> = builtin_presets()
            .into_keys()
            .chain(self.presets.keys().cloned())
            .collect();
        names.sort();
        names.dedup();
        names
    }

    /// Devices from `[[lights]]`, in file order.
    pub fn devices(&self) -> Vec<DeviceInfo> {
        self.lights.iter().map(LightConfig::to_device).collect()
    }
}

/// `$XDG_CONFIG_HOME/elgato-keylight/config.toml`, falling back to
/// `$HOME/.config`. `None` when neither variable is set.
pub fn default_config_path() -> Option<PathBuf> {
    let base = std::env::var_os("XDG_CONFIG_HOME")
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".config")))?;
    Some(base.join("elgato-keylight").join("config.toml"))
}

/// Load the config at `path`. A missing file is not an error: the defaults
/// apply.
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!("no config at {}, using defaults", path.display());
            return Ok(AppConfig::default());
        }
        Err(e) => return Err(Error::config(path, e)),
    };
    text.parse().map_err(|e| Error::config(path, e))
}
