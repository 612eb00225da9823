//! Light effects: flash, pulse, celebrate, alert, dim and moods.
//!
//! An [`Effect`] turns the light's current state into a fixed script of
//! [`Step`]s. Running it writes each step in order and waits the step's delay
//! before the next one. Every effect except a mood ends with a step that
//! writes back the state the light had before it started.

use std::str::FromStr;
use std::time::Duration;

use log::debug;
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter, EnumString, IntoStaticStr};

use crate::errors::Error;
use crate::fleet::{Fleet, FleetResults};
use crate::light::KeyLight;
use crate::state::LightState;

type Result<T> = std::result::Result<T, Error>;

/// Mood lighting. Unlike other effects a mood is meant to stay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, EnumString, Display, IntoStaticStr)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Mood {
    Cozy,
    Focus,
    Relax,
    Energize,
    Movie,
}

impl Mood {
    pub fn state(&self) -> LightState {
        match self {
            Mood::Cozy => LightState::new(true, 25, 320),
            Mood::Focus => LightState::new(true, 70, 200),
            Mood::Relax => LightState::new(true, 30, 280),
            Mood::Energize => LightState::new(true, 90, 160),
            Mood::Movie => LightState::new(true, 10, 300),
        }
    }

    /// Parse a mood name.
    ///
    /// # Examples
    ///
    /// ```
    /// use elgato_keylight::Mood;
    ///
    /// assert_eq!(Mood::parse("Cozy").unwrap(), Mood::Cozy);
    /// assert!(Mood::parse("gloomy").is_err());
    /// ```
    pub fn parse(name: &str) -> Result<Self> {
        Mood::from_str(name).map_err(|_| Error::UnknownMood(name.to_string()))
    }

    pub fn names() -> Vec<&'static str> {
        Mood::iter().map(Into::into).collect()
    }
}

/// One scripted write: the state to send, then how long to wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    pub state: LightState,
    pub delay: Duration,
}

impl Step {
    fn new(state: LightState, delay: Duration) -> Self {
        Step { state, delay }
    }
}

/// A time-sequenced series of state changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// Full brightness on and off.
    Flash { times: u32, interval: Duration },
    /// Brightness ramps 10 to 100 and back, in steps of 5.
    Pulse { cycles: u32, step: Duration },
    /// Temperature sweeps cool to warm and back, three times.
    Celebrate,
    /// Fast cool-white flashes.
    Alert { flashes: u32 },
    /// Linear fade to `target` over `steps` steps, held for two seconds.
    Dim { target: u16, steps: u32 },
    Mood(Mood),
}

impl Effect {
    const CELEBRATE_TEMPERATURES: [u16; 5] = [143, 200, 250, 300, 344];
    const CELEBRATE_DELAY: Duration = Duration::from_millis(200);
    const ALERT_DELAY: Duration = Duration::from_millis(150);
    const DIM_DELAY: Duration = Duration::from_millis(100);
    const DIM_HOLD: Duration = Duration::from_secs(2);
    const DIM_FLOOR: u16 = 3;

    pub fn flash(times: u32) -> Self {
        Effect::Flash {
            times,
            interval: Duration::from_millis(300),
        }
    }

    pub fn pulse(cycles: u32) -> Self {
        Effect::Pulse {
            cycles,
            step: Duration::from_millis(50),
        }
    }

    pub fn alert(flashes: u32) -> Self {
        Effect::Alert { flashes }
    }

    pub fn dim(target: u16) -> Self {
        Effect::Dim { target, steps: 20 }
    }

    /// Whether the script ends by writing back the starting state.
    pub fn restores(&self) -> bool {
        !matches!(self, Effect::Mood(_))
    }

    /// The steps this effect writes to a light currently in `current`.
    ///
    /// # Examples
    ///
    /// ```
    /// use elgato_keylight::{Effect, LightState};
    ///
    /// let current = LightState::new(true, 40, 250);
    /// let script = Effect::flash(3).script(&current);
    /// assert_eq!(script.len(), 7);
    /// assert_eq!(script.last().unwrap().state, current);
    /// ```
    pub fn script(&self, current: &LightState) -> Vec<Step> {
        let mut steps = match *self {
            Effect::Flash { times, interval } => {
                Self::blink(times, LightState::new(true, 100, 200), interval)
            }
            Effect::Pulse { cycles, step } => (0..cycles)
                .flat_map(|_| {
                    let up = (10..=100).step_by(5);
                    let down = (10..=100).rev().step_by(5);
                    up.chain(down)
                        .map(move |b| Step::new(LightState::new(true, b, 200), step))
                })
                .collect(),
            Effect::Celebrate => (0..3)
                .flat_map(|_| {
                    let temps = Self::CELEBRATE_TEMPERATURES;
                    temps.into_iter().chain(temps.into_iter().rev()).map(|t| {
                        Step::new(LightState::new(true, 80, t), Self::CELEBRATE_DELAY)
                    })
                })
                .collect(),
            Effect::Alert { flashes } => {
                Self::blink(flashes, LightState::new(true, 100, 143), Self::ALERT_DELAY)
            }
            Effect::Dim { target, steps } => Self::fade(current, target, steps),
            Effect::Mood(mood) => vec![Step::new(mood.state(), Duration::ZERO)],
        };
        if self.restores() {
            steps.push(Step::new(*current, Duration::ZERO));
        }
        steps
    }

    fn blink(times: u32, lit: LightState, delay: Duration) -> Vec<Step> {
        (0..times)
            .flat_map(|_| [Step::new(lit, delay), Step::new(LightState::off(), delay)])
            .collect()
    }

    fn fade(current: &LightState, target: u16, steps: u32) -> Vec<Step> {
        let steps = steps.max(1);
        let start = f64::from(current.brightness);
        let span = f64::from(target) - start;
        (0..=steps)
            .map(|i| {
                let t = f64::from(i) / f64::from(steps);
                // Truncation toward zero, then the floor keeps the light visibly on.
                let brightness = ((start + span * t) as u16).max(Self::DIM_FLOOR);
                let delay = if i == steps {
                    Self::DIM_DELAY + Self::DIM_HOLD
                } else {
                    Self::DIM_DELAY
                };
                Step::new(LightState::new(true, brightness, current.temperature), delay)
            })
            .collect()
    }
}

/// Run `effect` on one light and return the last state it confirmed.
///
/// The first failing write stops the script for this light; the error
/// carries the 1-based step number. A failed initial read is step 0.
pub async fn run_on(light: &KeyLight, effect: &Effect) -> Result<LightState> {
    let abort = |step: usize, source: Error| Error::Effect {
        device: light.name().to_string(),
        step,
        source: Box::new(source),
    };

    let current = match effect {
        Effect::Mood(_) => LightState::default(),
        _ => light.get_state().await.map_err(|e| abort(0, e))?,
    };

    let mut last = current;
    for (i, step) in effect.script(&current).iter().enumerate() {
        last = light
            .set_state(&step.state)
            .await
            .map_err(|e| abort(i + 1, e))?;
        if !step.delay.is_zero() {
            tokio::time::sleep(step.delay).await;
        }
    }
    debug!("{:?} finished on {}", effect, light.name());
    Ok(last)
}

/// Run `effect` on every light of `fleet`. All lights play their scripts
/// together, whatever the fleet's concurrency limit; a failure on one does
/// not stop the others.
pub async fn run_effect(fleet: &Fleet, effect: &Effect) -> FleetResults {
    fleet.for_each_at_once(|light| run_on(light, effect)).await
}
