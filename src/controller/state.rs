use crate::config::ControllerConfig;
use crate::detection::SpeciesMap;
use std::time::{Duration, SystemTime};

/// Persistent controller state; exactly one instance per controller
#[derive(Debug, Clone, PartialEq)]
pub struct ActuationState {
    pub feed_ready: bool,
    pub last_feed_time: Option<SystemTime>,
    pub deterrent_active: bool,
    pub last_deterrent_sighting: Option<SystemTime>,
    /// Feedings issued since the last reset
    pub feed_count: u64,
    /// Feedings the actuator reported as not delivered
    pub failed_feeds: u64,
    pub(crate) prior_feed_time: Option<SystemTime>,
    pub(crate) last_observed: Option<SystemTime>,
}

impl ActuationState {
    /// Start state, with `now` as the baseline for clock checks
    pub fn start(now: Option<SystemTime>) -> Self {
        Self {
            last_observed: now,
            ..Self::default()
        }
    }
}

impl Default for ActuationState {
    fn default() -> Self {
        Self {
            feed_ready: true,
            last_feed_time: None,
            deterrent_active: false,
            last_deterrent_sighting: None,
            feed_count: 0,
            failed_feeds: 0,
            prior_feed_time: None,
            last_observed: None,
        }
    }
}

/// Tunables for the controller
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControllerSettings {
    pub confidence_threshold: f32,
    pub feed_cooldown: Duration,
    pub deterrent_cooldown: Duration,
    pub species: SpeciesMap,
}

impl From<&ControllerConfig> for ControllerSettings {
    fn from(config: &ControllerConfig) -> Self {
        Self {
            confidence_threshold: config.confidence_threshold,
            feed_cooldown: config.feed_cooldown(),
            deterrent_cooldown: config.deterrent_cooldown(),
            species: SpeciesMap::from(config),
        }
    }
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self::from(&ControllerConfig::default())
    }
}
