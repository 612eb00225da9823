//! Inclusive value ranges and the policy for values that fall outside them.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::Error;

/// An inclusive `[min, max]` range of device units.
///
/// # Examples
///
/// ```
/// use elgato_keylight::ValueRange;
///
/// let range = ValueRange::new(143, 344);
/// assert!(range.contains(200));
/// assert_eq!(range.clamp(100), 143);
/// assert_eq!(range.clamp(400), 344);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueRange {
    min: u16,
    max: u16,
}

impl ValueRange {
    /// Bounds given in the wrong order are swapped.
    pub const fn new(min: u16, max: u16) -> Self {
        if min <= max {
            ValueRange { min, max }
        } else {
            ValueRange { min: max, max: min }
        }
    }

    pub fn min(&self) -> u16 {
        self.min
    }

    pub fn max(&self) -> u16 {
        self.max
    }

    pub fn contains(&self, value: i64) -> bool {
        (i64::from(self.min)..=i64::from(self.max)).contains(&value)
    }

    /// Pull `value` onto the nearest bound.
    pub fn clamp(&self, value: i64) -> u16 {
        // Both bounds are u16, so the clamped value always fits.
        value.clamp(i64::from(self.min), i64::from(self.max)) as u16
    }
}

impl fmt::Display for ValueRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.min, self.max)
    }
}

/// What to do with a value outside a device's declared range.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RangePolicy {
    /// Pull the value onto the nearest bound.
    #[default]
    Clamp,
    /// Refuse the value with [`Error::OutOfRange`].
    Reject,
}

impl RangePolicy {
    /// Bring `value` into `range`, or fail, depending on the policy.
    ///
    /// # Examples
    ///
    /// ```
    /// use elgato_keylight::{RangePolicy, ValueRange};
    ///
    /// let range = ValueRange::new(0, 100);
    /// assert_eq!(RangePolicy::Clamp.apply("brightness", 120, range).unwrap(), 100);
    /// assert!(RangePolicy::Reject.apply("brightness", 120, range).is_err());
    /// assert_eq!(RangePolicy::Reject.apply("brightness", 42, range).unwrap(), 42);
    /// ```
    pub fn apply(self, field: &'static str, value: i64, range: ValueRange) -> Result<u16, Error> {
        if range.contains(value) {
            return Ok(range.clamp(value));
        }
        match self {
            RangePolicy::Clamp => {
                log::debug!("clamping {field} {value} into {range}");
                Ok(range.clamp(value))
            }
            RangePolicy::Reject => Err(Error::OutOfRange {
                field,
                value,
                range,
            }),
        }
    }
}
