//! Color temperature conversion.

use serde::{Deserialize, Serialize};

/// Color temperature in Kelvin.
///
/// Key Lights speak a mired-like scale (`1_000_000 / kelvin`); this type
/// converts between the two. Lower Kelvin values produce warmer light.
///
/// # Examples
///
/// ```
/// use elgato_keylight::Kelvin;
///
/// assert_eq!(Kelvin::from_device(200).kelvin(), 5000);
/// assert_eq!(Kelvin::new(7000).to_device(), 143);
/// ```
#[derive(Default, Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct Kelvin {
    pub(crate) kelvin: u32,
}

impl Kelvin {
    pub fn new(kelvin: u32) -> Self {
        Kelvin { kelvin }
    }

    /// Get the kelvin value.
    pub fn kelvin(&self) -> u32 {
        self.kelvin
    }

    /// Convert a device temperature value. Zero maps to zero.
    pub fn from_device(value: u16) -> Self {
        match value {
            0 => Kelvin { kelvin: 0 },
            v => Kelvin {
                kelvin: 1_000_000 / u32::from(v),
            },
        }
    }

    /// Convert to the device scale, rounding to the nearest unit.
    ///
    /// The result is not range-checked; see [`crate::Capabilities`].
    pub fn to_device(&self) -> u16 {
        if self.kelvin == 0 {
            return u16::MAX;
        }
        let value = (1_000_000 + self.kelvin / 2) / self.kelvin;
        u16::try_from(value).unwrap_or(u16::MAX)
    }
}
