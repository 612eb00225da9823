//! Status-bar summary in waybar's custom-module JSON format.

use serde::Serialize;

use crate::errors::Error;
use crate::state::LightState;

/// One line of output for a waybar `custom` module with `return-type: json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WaybarStatus {
    pub text: String,
    pub tooltip: String,
    pub class: String,
}

impl WaybarStatus {
    const ICON_ON: &'static str = "\u{f0335}";
    const ICON_OFF: &'static str = "\u{f0336}";

    /// Summarise per-light read results, given in display order.
    ///
    /// Lights that could not be read are listed as unreachable; only when
    /// none could be read does the whole module turn into an error.
    ///
    /// # Examples
    ///
    /// ```
    /// use elgato_keylight::{Error, LightState, WaybarStatus};
    ///
    /// let right: Result<LightState, Error> = Ok(LightState::new(true, 40, 200));
    /// let left: Result<LightState, Error> = Ok(LightState::new(false, 80, 200));
    /// let status = WaybarStatus::from_results([("right", &right), ("left", &left)]);
    /// assert_eq!(status.class, "mixed");
    /// assert!(status.text.ends_with(" 40%"));
    /// ```
    pub fn from_results<'a, I>(lights: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a Result<LightState, Error>)>,
    {
        let mut states = Vec::new();
        let mut unreachable = Vec::new();
        for (name, result) in lights {
            match result {
                Ok(state) => states.push((name, state)),
                Err(_) => unreachable.push(name),
            }
        }

        if states.is_empty() && !unreachable.is_empty() {
            return Self::error("All lights unreachable");
        }

        let on: Vec<&LightState> = states.iter().map(|(_, s)| *s).filter(|s| s.on).collect();
        let class = if !states.is_empty() && on.len() == states.len() {
            "on"
        } else if !on.is_empty() {
            "mixed"
        } else {
            "off"
        };

        let text = if on.is_empty() {
            Self::ICON_OFF.to_string()
        } else {
            let total: usize = on.iter().map(|s| usize::from(s.brightness)).sum();
            format!("{} {}%", Self::ICON_ON, total / on.len())
        };

        let tooltip = states
            .iter()
            .map(|(name, s)| {
                format!(
                    "{name}: {} | {}% | ~{}K",
                    if s.on { "on" } else { "off" },
                    s.brightness,
                    s.temperature_kelvin().kelvin()
                )
            })
            .chain(unreachable.iter().map(|name| format!("{name}: unreachable")))
            .collect::<Vec<_>>()
            .join("\n");

        WaybarStatus {
            text,
            tooltip,
            class: class.to_string(),
        }
    }

    /// A status for when nothing could be read at all.
    pub fn error(tooltip: &str) -> Self {
        WaybarStatus {
            text: format!("{} --", Self::ICON_OFF),
            tooltip: tooltip.to_string(),
            class: "error".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unreachable() -> Result<LightState, Error> {
        Err(Error::protocol("x", "gone"))
    }

    #[test]
    fn test_all_on_averages_brightness() {
        let a: Result<LightState, Error> = Ok(LightState::new(true, 40, 200));
        let b: Result<LightState, Error> = Ok(LightState::new(true, 61, 250));
        let status = WaybarStatus::from_results([("right", &a), ("left", &b)]);

        assert_eq!(status.class, "on");
        assert_eq!(status.text, format!("{} 50%", WaybarStatus::ICON_ON));
        assert_eq!(
            status.tooltip,
            "right: on | 40% | ~5000K\nleft: on | 61% | ~4000K"
        );
    }

    #[test]
    fn test_partial_failure_marks_only_that_light() {
        let a: Result<LightState, Error> = Ok(LightState::new(false, 40, 200));
        let b = unreachable();
        let status = WaybarStatus::from_results([("right", &a), ("left", &b)]);

        assert_eq!(status.class, "off");
        assert_eq!(status.text, WaybarStatus::ICON_OFF);
        assert_eq!(status.tooltip, "right: off | 40% | ~5000K\nleft: unreachable");
    }

    #[test]
    fn test_all_unreachable_is_error() {
        let a = unreachable();
        let status = WaybarStatus::from_results([("right", &a)]);
        assert_eq!(status.class, "error");
        assert_eq!(status.tooltip, "All lights unreachable");
    }

    #[test]
    fn test_json_shape() {
        let json = serde_json::to_value(WaybarStatus::error("boom")).unwrap();
        assert_eq!(json["class"], "error");
        assert_eq!(json["tooltip"], "boom");
    }
}
