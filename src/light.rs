//! Individual light control.

use std::time::Duration;

use log::debug;
use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;

use crate::device::{AccessoryInfo, DeviceInfo};
use crate::errors::Error;
use crate::state::{LightState, LightsPayload};
use crate::types::{PowerMode, RangePolicy};

type Result<T> = std::result::Result<T, Error>;

/// Per-request settings shared by every light in an invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientOptions {
    /// Upper bound on one request, connect through body.
    pub timeout: Duration,
    /// Applied to every state before it is written.
    pub policy: RangePolicy,
}

impl Default for ClientOptions {
    fn default() -> Self {
        ClientOptions {
            timeout: Duration::from_secs(5),
            policy: RangePolicy::Clamp,
        }
    }
}

/// Async client for a single Elgato Key Light.
///
/// Every operation is a single request (or a read followed by a write) with
/// no retry. Connection failures and timeouts surface as
/// [`Error::Unreachable`], anything the device says that does not fit the API
/// as [`Error::Protocol`].
///
/// # Example
///
/// ```
/// use elgato_keylight::{ClientOptions, DeviceAddress, DeviceInfo, KeyLight};
///
/// let device = DeviceInfo::new("", "left", DeviceAddress::new("192.168.0.62", 9123));
/// let light = KeyLight::new(device, &ClientOptions::default());
/// assert_eq!(light.name(), "left");
/// ```
#[derive(Debug, Clone)]
pub struct KeyLight {
    device: DeviceInfo,
    base_url: String,
    options: ClientOptions,
    http: reqwest::Client,
}

impl KeyLight {
    const LIGHTS_PATH: &'static str = "/elgato/lights";
    const IDENTIFY_PATH: &'static str = "/elgato/lights/identify";
    const INFO_PATH: &'static str = "/elgato/accessory-info";

    pub fn new(device: DeviceInfo, options: &ClientOptions) -> Self {
        Self::with_client(device, options, reqwest::Client::new())
    }

    /// Build a light that shares an existing HTTP client (and its pool).
    pub fn with_client(device: DeviceInfo, options: &ClientOptions, http: reqwest::Client) -> Self {
        KeyLight {
            base_url: device.address.base_url(),
            device,
            options: *options,
            http,
        }
    }

    pub fn device(&self) -> &DeviceInfo {
        &self.device
    }

    pub fn name(&self) -> &str {
        &self.device.name
    }

    /// Reads the current state (live network call).
    pub async fn get_state(&self) -> Result<LightState> {
        let payload: LightsPayload = self
            .request(self.http.get(self.url(Self::LIGHTS_PATH)))
            .await?;
        payload
            .first()
            .ok_or_else(|| Error::protocol(self.name(), "no lights in response"))
    }

    /// Writes `desired` and returns the state the device confirms.
    pub async fn set_state(&self, desired: &LightState) -> Result<LightState> {
        let state = desired.validated(&self.device.capabilities, self.options.policy)?;
        let body = LightsPayload::single(&state);
        debug!("PUT {} -> {}: {:?}", Self::LIGHTS_PATH, self.device.address, body);

        let payload: LightsPayload = self
            .request(self.http.put(self.url(Self::LIGHTS_PATH)).json(&body))
            .await?;
        payload
            .first()
            .ok_or_else(|| Error::protocol(self.name(), "no lights in response"))
    }

    /// Turns the light on, optionally changing brightness and temperature.
    pub async fn turn_on(
        &self,
        brightness: Option<u16>,
        temperature: Option<u16>,
    ) -> Result<LightState> {
        let mut state = self.get_state().await?;
        state.on = true;
        if let Some(b) = brightness {
            state.brightness = b;
        }
        if let Some(t) = temperature {
            state.temperature = t;
        }
        self.set_state(&state).await
    }

    pub async fn turn_off(&self) -> Result<LightState> {
        self.set_power(PowerMode::Off).await
    }

    pub async fn set_power(&self, power: PowerMode) -> Result<LightState> {
        let mut state = self.get_state().await?;
        state.on = power.is_on();
        self.set_state(&state).await
    }

    pub async fn toggle(&self) -> Result<LightState> {
        let mut state = self.get_state().await?;
        state.on = !state.on;
        self.set_state(&state).await
    }

    /// Sets brightness in percent, subject to the range policy.
    pub async fn set_brightness(&self, brightness: i64) -> Result<LightState> {
        let caps = self.device.capabilities;
        let brightness = self
            .options
            .policy
            .apply("brightness", brightness, caps.brightness)?;
        let mut state = self.get_state().await?;
        state.brightness = brightness;
        self.set_state(&state).await
    }

    /// Moves brightness by `delta`, stopping at the range bounds.
    pub async fn adjust_brightness(&self, delta: i64) -> Result<LightState> {
        let mut state = self.get_state().await?;
        state.brightness = self
            .device
            .capabilities
            .brightness
            .clamp(i64::from(state.brightness).saturating_add(delta));
        self.set_state(&state).await
    }

    /// Sets color temperature in device units (143 cool to 344 warm).
    pub async fn set_temperature(&self, temperature: i64) -> Result<LightState> {
        let caps = self.device.capabilities;
        let temperature = self
            .options
            .policy
            .apply("temperature", temperature, caps.temperature)?;
        let mut state = self.get_state().await?;
        state.temperature = temperature;
        self.set_state(&state).await
    }

    /// Makes the light blink briefly so it can be found.
    pub async fn identify(&self) -> Result<()> {
        self.send(self.http.post(self.url(Self::IDENTIFY_PATH)))
            .await
            .map(|_| ())
    }

    pub async fn get_info(&self) -> Result<AccessoryInfo> {
        self.request(self.http.get(self.url(Self::INFO_PATH))).await
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn request<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T> {
        let body = self.send(req).await?;
        debug!("response from {}: {}", self.device.address, String::from_utf8_lossy(&body));
        serde_json::from_slice(&body)
            .map_err(|e| Error::protocol(self.name(), format!("invalid body: {e}")))
    }

    async fn send(&self, req: RequestBuilder) -> Result<Vec<u8>> {
        let resp = req
            .timeout(self.options.timeout)
            .send()
            .await
            .map_err(|e| Error::unreachable(self.name(), e))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(Error::protocol(self.name(), format!("HTTP status {status}")));
        }

        let body = resp
            .bytes()
            .await
            .map_err(|e| Error::unreachable(self.name(), e))?;
        Ok(body.to_vec())
    }
}
