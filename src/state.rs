//! Light state and its wire form.

use serde::{Deserialize, Serialize};

use crate::errors::Error;
use crate::types::{Capabilities, Kelvin, PowerMode, RangePolicy};

/// Observed or desired operating state of a single light.
///
/// # Examples
///
/// ```
/// use elgato_keylight::LightState;
///
/// let state = LightState::new(true, 40, 250);
/// assert!(state.on);
/// assert_eq!(state.temperature_kelvin().kelvin(), 4000);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LightState {
    pub on: bool,
    pub brightness: u16,
    pub temperature: u16,
}

impl Default for LightState {
    fn default() -> Self {
        LightState {
            on: false,
            brightness: Self::DEFAULT_BRIGHTNESS,
            temperature: Self::DEFAULT_TEMPERATURE,
        }
    }
}

impl LightState {
    pub const DEFAULT_BRIGHTNESS: u16 = 50;
    pub const DEFAULT_TEMPERATURE: u16 = 200;

    pub fn new(on: bool, brightness: u16, temperature: u16) -> Self {
        LightState {
            on,
            brightness,
            temperature,
        }
    }

    /// A switched-off state carrying the default brightness and temperature.
    pub fn off() -> Self {
        Self::default()
    }

    pub fn power(&self) -> PowerMode {
        PowerMode::from(self.on)
    }

    pub fn temperature_kelvin(&self) -> Kelvin {
        Kelvin::from_device(self.temperature)
    }

    /// Bring this state inside the device's ranges according to `policy`.
    ///
    /// # Examples
    ///
    /// ```
    /// use elgato_keylight::{Capabilities, LightState, RangePolicy};
    ///
    /// let state = LightState::new(true, 140, 100)
    ///     .validated(&Capabilities::default(), RangePolicy::Clamp)
    ///     .unwrap();
    /// assert_eq!(state, LightState::new(true, 100, 143));
    /// ```
    pub fn validated(&self, caps: &Capabilities, policy: RangePolicy) -> Result<Self, Error> {
        Ok(LightState {
            on: self.on,
            brightness: policy.apply("brightness", self.brightness.into(), caps.brightness)?,
            temperature: policy.apply("temperature", self.temperature.into(), caps.temperature)?,
        })
    }
}

/// Body of `GET`/`PUT /elgato/lights`.
#[serde_with::skip_serializing_none]
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub(crate) struct LightsPayload {
    pub number_of_lights: Option<usize>,
    pub lights: Vec<WireLight>,
}

impl LightsPayload {
    pub fn single(state: &LightState) -> Self {
        LightsPayload {
            number_of_lights: Some(1),
            lights: vec![WireLight::from(state)],
        }
    }

    /// The first light entry; a Key Light only ever reports one.
    pub fn first(&self) -> Option<LightState> {
        self.lights.first().map(LightState::from)
    }
}

/// One entry of the `lights` array. The device encodes `on` as 0 or 1.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub(crate) struct WireLight {
    #[serde(default)]
    pub on: u8,
    #[serde(default = "default_brightness")]
    pub brightness: u16,
    #[serde(default = "default_temperature")]
    pub temperature: u16,
}

fn default_brightness() -> u16 {
    LightState::DEFAULT_BRIGHTNESS
}

fn default_temperature() -> u16 {
    LightState::DEFAULT_TEMPERATURE
}

impl From<&LightState> for WireLight {
    fn from(state: &LightState) -> Self {
        WireLight {
            on: u8::from(state.on),
            brightness: state.brightness,
            temperature: state.temperature,
        }
    }
}

impl From<&WireLight> for LightState {
    fn from(wire: &WireLight) -> Self {
        LightState {
            on: wire.on != 0,
            brightness: wire.brightness,
            temperature: wire.temperature,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_payload_matches_device_shape() {
        let payload = LightsPayload::single(&LightState::new(true, 18, 181));
        assert_eq!(
            serde_json::to_value(&payload).unwrap(),
            json!({
                "numberOfLights": 1,
                "lights": [{"on": 1, "brightness": 18, "temperature": 181}]
            })
        );
    }

    #[test]
    fn test_missing_fields_fall_back_to_defaults() {
        let payload: LightsPayload =
            serde_json::from_value(json!({"lights": [{"on": 1}]})).unwrap();
        assert_eq!(payload.first(), Some(LightState::new(true, 50, 200)));
    }

    #[test]
    fn test_empty_lights_has_no_state() {
        let payload: LightsPayload =
            serde_json::from_value(json!({"numberOfLights": 0, "lights": []})).unwrap();
        assert_eq!(payload.first(), None);
    }

    #[test]
    fn test_reject_policy_refuses_out_of_range() {
        let err = LightState::new(true, 101, 200)
            .validated(&Capabilities::default(), RangePolicy::Reject)
            .unwrap_err();
        assert!(matches!(err, Error::OutOfRange { field: "brightness", value: 101, .. }));
    }
}
