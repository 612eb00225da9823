//! Device identity and product metadata.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::Capabilities;

/// Network address of a light's HTTP API.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceAddress {
    pub host: String,
    pub port: u16,
}

impl DeviceAddress {
    pub const DEFAULT_PORT: u16 = 9123;

    pub fn new(host: &str, port: u16) -> Self {
        DeviceAddress {
            host: host.to_string(),
            port,
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

impl fmt::Display for DeviceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Identity of one physical light.
///
/// Built either from a `[[lights]]` config entry or from an mDNS
/// advertisement. Re-created on every discovery pass.
///
/// # Example
///
/// ```
/// use elgato_keylight::{DeviceAddress, DeviceInfo};
///
/// let device = DeviceInfo::new("", "right", DeviceAddress::new("192.168.0.60", 9123));
/// assert_eq!(device.key(), "right");
///
/// let device = device.with_id("3C:6A:9D:12:34:56");
/// assert_eq!(device.key(), "3C:6A:9D:12:34:56");
/// ```
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    /// Vendor-assigned hardware id; empty when not known.
    pub id: String,
    pub name: String,
    pub address: DeviceAddress,
    /// Product model from the advertisement, e.g. "Elgato Key Light 20GAK9901".
    pub model: Option<String>,
    #[serde(skip)]
    pub capabilities: Capabilities,
}

impl DeviceInfo {
    pub fn new(id: &str, name: &str, address: DeviceAddress) -> Self {
        DeviceInfo {
            id: id.to_string(),
            name: name.to_string(),
            address,
            model: None,
            capabilities: Capabilities::default(),
        }
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.id = id.to_string();
        self
    }

    pub fn with_model(mut self, model: Option<&str>) -> Self {
        self.model = model.map(String::from);
        self
    }

    /// Stable key for per-device results: the hardware id, else the name.
    pub fn key(&self) -> &str {
        if self.id.is_empty() {
            &self.name
        } else {
            &self.id
        }
    }
}

/// Product metadata from `GET /elgato/accessory-info`.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct AccessoryInfo {
    pub product_name: String,
    pub hardware_board_type: u32,
    pub firmware_build_number: u32,
    pub firmware_version: String,
    pub serial_number: String,
    pub display_name: String,
}

impl AccessoryInfo {
    /// The user-assigned display name, or the product name when unset.
    pub fn label(&self) -> &str {
        if self.display_name.is_empty() {
            &self.product_name
        } else {
            &self.display_name
        }
    }
}
