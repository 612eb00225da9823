//! Named presets and their resolution to per-device target states.

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::config::AppConfig;
use crate::device::DeviceInfo;
use crate::errors::Error;
use crate::state::LightState;
use crate::types::RangePolicy;

type Result<T> = std::result::Result<T, Error>;

/// Brightness and temperature, either of which may be left unset.
///
/// Values are kept as raw config integers; they are brought into the
/// device's range only when a preset is resolved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PresetValues {
    pub brightness: Option<i64>,
    pub temperature: Option<i64>,
}

impl PresetValues {
    pub const fn new(brightness: i64, temperature: i64) -> Self {
        PresetValues {
            brightness: Some(brightness),
            temperature: Some(temperature),
        }
    }

    /// Field-wise fallback: keep what is set here, fill the rest from `other`.
    pub fn or(self, other: PresetValues) -> Self {
        PresetValues {
            brightness: self.brightness.or(other.brightness),
            temperature: self.temperature.or(other.temperature),
        }
    }
}

/// Which devices an [`Override`] applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Matcher {
    /// Vendor hardware id, compared case-insensitively.
    DeviceId(String),
    /// Device name, compared case-insensitively.
    Name(String),
}

impl Matcher {
    pub fn matches(&self, device: &DeviceInfo) -> bool {
        match self {
            Matcher::DeviceId(id) => !device.id.is_empty() && device.id.eq_ignore_ascii_case(id),
            Matcher::Name(name) => device.name.eq_ignore_ascii_case(name),
        }
    }

    // Lower ranks take precedence.
    fn rank(&self) -> u8 {
        match self {
            Matcher::DeviceId(_) => 0,
            Matcher::Name(_) => 1,
        }
    }
}

/// A per-device exception inside a [`Preset`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Override {
    pub matcher: Matcher,
    pub values: PresetValues,
}

/// A named target-state bundle with optional per-device overrides.
///
/// Fields resolve with the precedence device-id override, name override,
/// preset default, then [`LightState::DEFAULT_BRIGHTNESS`] /
/// [`LightState::DEFAULT_TEMPERATURE`]. Each field falls back on its own.
///
/// # Example
///
/// ```
/// use elgato_keylight::{DeviceAddress, DeviceInfo, Matcher, Preset, PresetValues, RangePolicy};
///
/// let preset = Preset::new(32, 179)
///     .with_override(Matcher::Name("right".into()), PresetValues::new(18, 181));
///
/// let right = DeviceInfo::new("", "right", DeviceAddress::new("10.0.0.2", 9123));
/// let left = DeviceInfo::new("", "left", DeviceAddress::new("10.0.0.3", 9123));
///
/// let state = preset.to_state(&right, RangePolicy::Clamp).unwrap();
/// assert_eq!((state.brightness, state.temperature), (18, 181));
/// let state = preset.to_state(&left, RangePolicy::Clamp).unwrap();
/// assert_eq!((state.brightness, state.temperature), (32, 179));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Preset {
    pub defaults: PresetValues,
    overrides: Vec<Override>,
}

impl Preset {
    pub fn new(brightness: i64, temperature: i64) -> Self {
        Preset {
            defaults: PresetValues::new(brightness, temperature),
            overrides: Vec::new(),
        }
    }

    pub fn from_values(defaults: PresetValues) -> Self {
        Preset {
            defaults,
            overrides: Vec::new(),
        }
    }

    /// Add an override, keeping the list ordered by matcher precedence.
    pub fn with_override(mut self, matcher: Matcher, values: PresetValues) -> Self {
        let at = self
            .overrides
            .partition_point(|o| o.matcher.rank() <= matcher.rank());
        self.overrides.insert(at, Override { matcher, values });
        self
    }

    /// Add an override for a config key, which may name a hardware id or a
    /// device name. The id interpretation wins when both match.
    pub fn with_key_override(self, key: &str, values: PresetValues) -> Self {
        self.with_override(Matcher::DeviceId(key.to_string()), values)
            .with_override(Matcher::Name(key.to_string()), values)
    }

    pub fn overrides(&self) -> &[Override] {
        &self.overrides
    }

    /// The merged, not yet range-checked, values for `device`.
    pub fn values_for(&self, device: &DeviceInfo) -> PresetValues {
        let builtin = PresetValues::new(
            LightState::DEFAULT_BRIGHTNESS.into(),
            LightState::DEFAULT_TEMPERATURE.into(),
        );
        self.overrides
            .iter()
            .filter(|o| o.matcher.matches(device))
            .fold(PresetValues::default(), |acc, o| acc.or(o.values))
            .or(self.defaults)
            .or(builtin)
    }

    /// The switched-on state this preset asks of `device`.
    pub fn to_state(&self, device: &DeviceInfo, policy: RangePolicy) -> Result<LightState> {
        let values = self.values_for(device);
        let caps = device.capabilities;
        Ok(LightState {
            on: true,
            brightness: policy.apply(
                "brightness",
                values.brightness.unwrap_or(LightState::DEFAULT_BRIGHTNESS.into()),
                caps.brightness,
            )?,
            temperature: policy.apply(
                "temperature",
                values.temperature.unwrap_or(LightState::DEFAULT_TEMPERATURE.into()),
                caps.temperature,
            )?,
        })
    }
}

/// Presets available without any config file.
pub fn builtin_presets() -> BTreeMap<String, Preset> {
    BTreeMap::from([
        ("bright".to_string(), Preset::new(100, 200)),
        ("dim".to_string(), Preset::new(15, 250)),
        ("warm".to_string(), Preset::new(60, 320)),
        ("cool".to_string(), Preset::new(70, 155)),
        ("video".to_string(), Preset::new(55, 215)),
        (
            "webcam".to_string(),
            Preset::new(32, 179)
                .with_key_override("right", PresetValues::new(18, 181))
                .with_key_override("left", PresetValues::new(46, 177)),
        ),
    ])
}

/// Resolve preset `name` into a target state for each device, keyed by
/// [`DeviceInfo::key`].
///
/// A user-defined preset replaces a built-in of the same name entirely.
/// Fails with [`Error::UnknownPreset`] before resolving anything when no
/// preset carries the name.
pub fn resolve_preset(
    name: &str,
    config: &AppConfig,
    devices: &[DeviceInfo],
) -> Result<BTreeMap<String, LightState>> {
    let preset = config.preset(name).ok_or_else(|| Error::UnknownPreset {
        name: name.to_string(),
        available: config.preset_names().join(", "),
    })?;

    let policy = config.client.range_policy;
    devices
        .iter()
        .map(|device| -> Result<(String, LightState)> {
            let state = preset.to_state(device, policy)?;
            Ok((device.key().to_string(), state))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::DeviceAddress;

    fn device(id: &str, name: &str) -> DeviceInfo {
        DeviceInfo::new(id, name, DeviceAddress::new("10.0.0.1", 9123))
    }

    fn devices() -> Vec<DeviceInfo> {
        vec![
            device("3C:6A:9D:00:00:01", "right"),
            device("3C:6A:9D:00:00:02", "left"),
            device("3C:6A:9D:00:00:03", "desk"),
        ]
    }

    #[test]
    fn test_webcam_right_override() {
        let states = resolve_preset("webcam", &AppConfig::default(), &devices()).unwrap();

        assert_eq!(states["3C:6A:9D:00:00:01"], LightState::new(true, 18, 181));
        assert_eq!(states["3C:6A:9D:00:00:02"], LightState::new(true, 46, 177));
        // No override for desk: the preset-level values apply.
        assert_eq!(states["3C:6A:9D:00:00:03"], LightState::new(true, 32, 179));
    }

    #[test]
    fn test_unknown_preset_resolves_nothing() {
        let err = resolve_preset("nonexistent", &AppConfig::default(), &devices()).unwrap_err();
        assert!(matches!(err, Error::UnknownPreset { ref name, .. } if name == "nonexistent"));
        assert!(err.to_string().contains("webcam"));
    }

    #[test]
    fn test_device_id_beats_name_field_by_field() {
        let preset = Preset::new(30, 200)
            .with_override(
                Matcher::Name("right".into()),
                PresetValues::new(10, 300),
            )
            .with_override(
                Matcher::DeviceId("3c:6a:9d:00:00:01".into()),
                PresetValues {
                    brightness: Some(90),
                    temperature: None,
                },
            );

        let values = preset.values_for(&device("3C:6A:9D:00:00:01", "right"));
        assert_eq!(values, PresetValues::new(90, 300));
    }

    #[test]
    fn test_overrides_are_ordered_by_precedence() {
        let preset = Preset::new(30, 200).with_key_override("right", PresetValues::new(1, 150));
        let kinds: Vec<_> = preset
            .overrides()
            .iter()
            .map(|o| matches!(o.matcher, Matcher::DeviceId(_)))
            .collect();
        assert_eq!(kinds, vec![true, false]);
    }

    #[test]
    fn test_empty_id_never_matches_device_id() {
        let preset = Preset::new(30, 200)
            .with_override(Matcher::DeviceId(String::new()), PresetValues::new(1, 150));
        assert_eq!(
            preset.values_for(&device("", "right")),
            PresetValues::new(30, 200)
        );
    }

    #[test]
    fn test_partial_values_fall_back_to_builtin_defaults() {
        let preset = Preset::from_values(PresetValues {
            brightness: Some(70),
            temperature: None,
        });
        let state = preset
            .to_state(&device("", "desk"), RangePolicy::Clamp)
            .unwrap();
        assert_eq!(state, LightState::new(true, 70, LightState::DEFAULT_TEMPERATURE));
    }

    #[test]
    fn test_out_of_range_values_clamp() {
        let preset = Preset::new(250, -3)
            .with_key_override("right", PresetValues::new(-20, 9000));

        let desk = preset.to_state(&device("", "desk"), RangePolicy::Clamp).unwrap();
        assert_eq!(desk, LightState::new(true, 100, 143));

        let right = preset.to_state(&device("", "right"), RangePolicy::Clamp).unwrap();
        assert_eq!(right, LightState::new(true, 0, 344));
    }

    #[test]
    fn test_reject_policy_fails_resolution() {
        let preset = Preset::new(250, 200);
        let err = preset
            .to_state(&device("", "desk"), RangePolicy::Reject)
            .unwrap_err();
        assert!(matches!(err, Error::OutOfRange { field: "brightness", value: 250, .. }));
    }
}
