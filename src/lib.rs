//! # elgato_keylight
//!
//! An async Rust library for controlling Elgato Key Lights over their local HTTP API.
//!
//! This crate discovers lights on the local network (or takes them from a
//! config file), reads and writes their state, resolves named presets with
//! per-light overrides, and runs short scripted effects across several lights
//! at once.
//!
//! ## Quick Start
//!
//! ```ignore
//! use elgato_keylight::{ClientOptions, DeviceAddress, DeviceInfo, KeyLight, LightState};
//!
//! async fn control_light() -> Result<(), elgato_keylight::Error> {
//!     let device = DeviceInfo::new("", "right", DeviceAddress::new("192.168.0.60", 9123));
//!     let light = KeyLight::new(device, &ClientOptions::default());
//!
//!     let state = light.set_state(&LightState::new(true, 40, 250)).await?;
//!     println!("right is at {}% (~{}K)", state.brightness, state.temperature_kelvin().kelvin());
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Light client**: read and write state with [`KeyLight`], with values
//!   clamped (or rejected, see [`RangePolicy`]) to the device's [`Capabilities`]
//! - **Fleet operations**: apply states to many lights concurrently with [`Fleet`];
//!   one unreachable light never fails the others
//! - **Presets**: built-in and user-defined [`Preset`]s with per-light overrides,
//!   resolved with [`resolve_preset`]
//! - **Effects**: flash, pulse, celebrate, alert, dim and [`Mood`]s via [`Effect`]
//! - **Discovery**: find lights with [`discover`] (mDNS through `avahi-browse`)
//! - **Status bar**: summarise the fleet for waybar with [`WaybarStatus`]
//!
//! ## Communication
//!
//! Key Lights serve JSON over plain HTTP on port 9123 with no authentication.
//! Every request is made once: there is no retry and no backoff. Connection
//! failures and timeouts are reported as [`Error::Unreachable`].
//!
//! ## Configuration
//!
//! [`load_config`] reads `~/.config/elgato-keylight/config.toml` (see
//! [`default_config_path`]); a missing file means built-in defaults and
//! discovery.

mod config;
mod device;
mod discovery;
mod effects;
mod errors;
mod fleet;
mod light;
#[cfg(test)]
mod mock;
mod preset;
mod state;
mod types;
mod waybar;

// Re-export public API
pub use config::{AppConfig, ClientConfig, LightConfig, default_config_path, load_config};
pub use device::{AccessoryInfo, DeviceAddress, DeviceInfo};
pub use discovery::{
    SERVICE_TYPE, discover, discover_all, parse_avahi_output, resolve_devices, select,
};
pub use effects::{Effect, Mood, Step, run_effect, run_on};
pub use errors::Error;
pub use fleet::{Fleet, FleetResults};
pub use light::{ClientOptions, KeyLight};
pub use preset::{Matcher, Override, Preset, PresetValues, builtin_presets, resolve_preset};
pub use state::LightState;
pub use types::{Capabilities, Kelvin, PowerMode, RangePolicy, ValueRange};
pub use waybar::WaybarStatus;
