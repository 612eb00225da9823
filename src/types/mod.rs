//! Value types for light control parameters.

mod capabilities;
mod kelvin;
mod power;
mod range;

pub use capabilities::Capabilities;
pub use kelvin::Kelvin;
pub use power::PowerMode;
pub use range::{RangePolicy, ValueRange};
