//! Concurrent operations across several lights.

use std::collections::BTreeMap;
use std::future::Future;

use futures::StreamExt;
use futures::stream;

use crate::config::AppConfig;
use crate::device::DeviceInfo;
use crate::errors::Error;
use crate::light::{ClientOptions, KeyLight};
use crate::state::LightState;

type Result<T> = std::result::Result<T, Error>;

/// Per-device outcomes of a fleet operation, keyed by [`DeviceInfo::key`].
///
/// One device failing never hides the others' results.
#[derive(Debug)]
pub struct FleetResults<T = LightState> {
    results: BTreeMap<String, Result<T>>,
}

impl<T> Default for FleetResults<T> {
    fn default() -> Self {
        FleetResults {
            results: BTreeMap::new(),
        }
    }
}

impl<T> FleetResults<T> {
    pub fn get(&self, key: &str) -> Option<&Result<T>> {
        self.results.get(key)
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Result<T>)> {
        self.results.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn successes(&self) -> impl Iterator<Item = (&str, &T)> {
        self.iter().filter_map(|(k, r)| r.as_ref().ok().map(|v| (k, v)))
    }

    pub fn failures(&self) -> impl Iterator<Item = (&str, &Error)> {
        self.iter().filter_map(|(k, r)| r.as_ref().err().map(|e| (k, e)))
    }

    /// True when no device failed (including when there were none).
    pub fn all_ok(&self) -> bool {
        self.results.values().all(Result::is_ok)
    }

    pub fn into_inner(self) -> BTreeMap<String, Result<T>> {
        self.results
    }
}

impl<T> Extend<(String, Result<T>)> for FleetResults<T> {
    fn extend<I: IntoIterator<Item = (String, Result<T>)>>(&mut self, iter: I) {
        self.results.extend(iter);
    }
}

impl<T> FromIterator<(String, Result<T>)> for FleetResults<T> {
    fn from_iter<I: IntoIterator<Item = (String, Result<T>)>>(iter: I) -> Self {
        FleetResults {
            results: iter.into_iter().collect(),
        }
    }
}

/// A set of lights operated on together.
///
/// Operations run concurrently with at most `max_concurrency` requests in
/// flight, so a handful of lights never turns into a burst of sockets on a
/// home router.
///
/// # Example
///
/// ```
/// use elgato_keylight::{ClientOptions, DeviceAddress, DeviceInfo, Fleet};
///
/// let devices = vec![
///     DeviceInfo::new("", "right", DeviceAddress::new("192.168.0.60", 9123)),
///     DeviceInfo::new("", "left", DeviceAddress::new("192.168.0.62", 9123)),
/// ];
/// let fleet = Fleet::new(devices, &ClientOptions::default(), 2);
/// assert_eq!(fleet.len(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct Fleet {
    lights: Vec<KeyLight>,
    max_concurrency: usize,
}

impl Fleet {
    pub fn new(devices: Vec<DeviceInfo>, options: &ClientOptions, max_concurrency: usize) -> Self {
        let http = reqwest::Client::new();
        Fleet {
            lights: devices
                .into_iter()
                .map(|device| KeyLight::with_client(device, options, http.clone()))
                .collect(),
            max_concurrency: max_concurrency.max(1),
        }
    }

    /// A fleet using the `[client]` settings of `config`.
    pub fn from_config(config: &AppConfig, devices: Vec<DeviceInfo>) -> Self {
        Self::new(devices, &config.client.options(), config.client.concurrency())
    }

    pub fn lights(&self) -> &[KeyLight] {
        &self.lights
    }

    pub fn len(&self) -> usize {
        self.lights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lights.is_empty()
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    /// Run `op` against every light, bounded by `max_concurrency`.
    pub async fn for_each<'a, F, Fut, T>(&'a self, op: F) -> FleetResults<T>
    where
        F: Fn(&'a KeyLight) -> Fut,
        Fut: Future<Output = Result<T>> + 'a,
    {
        self.run(self.lights.iter().map(|light| (light, op(light))), self.max_concurrency)
            .await
    }

    /// Run `op` against every light at the same time, ignoring
    /// `max_concurrency`. Each light still sees one request at a time when
    /// `op` is sequential, as effect scripts are.
    pub async fn for_each_at_once<'a, F, Fut, T>(&'a self, op: F) -> FleetResults<T>
    where
        F: Fn(&'a KeyLight) -> Fut,
        Fut: Future<Output = Result<T>> + 'a,
    {
        let limit = self.lights.len().max(1);
        self.run(self.lights.iter().map(|light| (light, op(light))), limit)
            .await
    }

    /// Query every light for its current state.
    pub async fn get_states(&self) -> FleetResults {
        self.for_each(|light| light.get_state()).await
    }

    /// Write each light's entry of `desired`. Lights without an entry are
    /// left alone and do not appear in the results.
    pub async fn apply(&self, desired: &BTreeMap<String, LightState>) -> FleetResults {
        let ops = self.lights.iter().filter_map(|light| {
            desired
                .get(light.device().key())
                .map(|state| (light, light.set_state(state)))
        });
        self.run(ops, self.max_concurrency).await
    }

    /// Write the same state to every light.
    pub async fn apply_all(&self, state: &LightState) -> FleetResults {
        self.for_each(|light| light.set_state(state)).await
    }

    async fn run<'a, I, Fut, T>(&'a self, ops: I, limit: usize) -> FleetResults<T>
    where
        I: Iterator<Item = (&'a KeyLight, Fut)>,
        Fut: Future<Output = Result<T>> + 'a,
    {
        stream::iter(ops.map(|(light, fut)| {
            let key = light.device().key().to_string();
            async move { (key, fut.await) }
        }))
        .buffer_unordered(limit)
        .collect()
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{InFlight, MockLight, unreachable_device};
    use std::sync::Arc;
    use crate::types::RangePolicy;
    use std::time::Duration;

    fn options() -> ClientOptions {
        ClientOptions {
            timeout: Duration::from_millis(500),
            policy: RangePolicy::Clamp,
        }
    }

    #[tokio::test]
    async fn test_one_unreachable_does_not_fail_the_rest() {
        let right = MockLight::start("right").await;
        let left = MockLight::start("left").await;
        let gone = unreachable_device("desk").await;

        let devices = vec![right.device(), gone.clone(), left.device()];
        let fleet = Fleet::new(devices.clone(), &options(), 2);

        let desired: BTreeMap<String, LightState> = devices
            .iter()
            .map(|d| (d.key().to_string(), LightState::new(true, 42, 250)))
            .collect();
        let results = fleet.apply(&desired).await;

        assert_eq!(results.len(), 3);
        assert_eq!(results.successes().count(), 2);
        let failures: Vec<_> = results.failures().collect();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].0, "desk");
        assert!(failures[0].1.is_unreachable());
        assert!(!results.all_ok());

        assert_eq!(right.state(), LightState::new(true, 42, 250));
        assert_eq!(left.state(), LightState::new(true, 42, 250));
    }

    #[tokio::test]
    async fn test_apply_skips_lights_without_a_target() {
        let right = MockLight::start("right").await;
        let left = MockLight::start("left").await;
        let fleet = Fleet::new(vec![right.device(), left.device()], &options(), 1);

        let desired = BTreeMap::from([(
            right.device().key().to_string(),
            LightState::new(true, 10, 300),
        )]);
        let results = fleet.apply(&desired).await;

        assert_eq!(results.len(), 1);
        assert!(results.all_ok());
        assert_eq!(left.puts(), 0);
    }

    #[tokio::test]
    async fn test_get_states_and_for_each() {
        let right = MockLight::start("right").await;
        right.set(LightState::new(true, 80, 180));
        let fleet = Fleet::new(vec![right.device()], &options(), 4);

        let states = fleet.get_states().await;
        assert_eq!(
            states.get(right.device().key()).unwrap().as_ref().unwrap(),
            &LightState::new(true, 80, 180)
        );

        let toggled = fleet.for_each(|light| light.toggle()).await;
        assert!(!toggled.successes().next().unwrap().1.on);
    }

    #[tokio::test]
    async fn test_requests_in_flight_stay_under_the_limit() {
        let gauge = Arc::new(InFlight::default());
        let mut mocks = Vec::new();
        for i in 0..6 {
            let mock = MockLight::start(&format!("light{i}")).await;
            mock.track(gauge.clone(), Duration::from_millis(50));
            mocks.push(mock);
        }
        let fleet = Fleet::new(mocks.iter().map(MockLight::device).collect(), &options(), 2);

        let results = fleet.get_states().await;

        assert_eq!(results.len(), 6);
        assert!(results.all_ok());
        assert!(gauge.peak() <= 2, "peak was {}", gauge.peak());
        assert!(gauge.peak() >= 1);
    }

    #[tokio::test]
    async fn test_empty_fleet_is_ok() {
        let fleet = Fleet::new(Vec::new(), &options(), 0);
        assert_eq!(fleet.max_concurrency(), 1);
        let results = fleet.get_states().await;
        assert!(results.is_empty());
        assert!(results.all_ok());
    }
}
