//! Detection-driven actuation state machine.
//!
//! The controller turns per-frame detection batches into rate-limited
//! feeder and deterrent commands. It performs no I/O: callers dispatch the
//! returned commands and report undelivered feedings back through
//! [`ActuationController::feed_not_delivered`].

mod shared;
mod state;
mod types;

#[cfg(test)]
mod tests;

pub use shared::SharedController;
pub use state::{ActuationState, ControllerSettings};
pub use types::{ActuationCommand, FrameOutcome, StatusMessage, DIAGNOSTIC_LINE, PRIMARY_LINE};

use crate::cooldown::is_cooldown_expired;
use crate::detection::{DetectionEvent, DetectionRecord, LabelMap, RawDetection, Species};
use crate::error::DetectionError;
use std::time::SystemTime;
use tracing::{debug, info, warn};

pub struct ActuationController {
    settings: ControllerSettings,
    state: ActuationState,
}

impl ActuationController {
    pub fn new(settings: ControllerSettings) -> Self {
        Self {
            settings,
            state: ActuationState::default(),
        }
    }

    pub fn settings(&self) -> &ControllerSettings {
        &self.settings
    }

    pub fn state(&self) -> &ActuationState {
        &self.state
    }

    /// Process one frame of already-typed detections
    pub fn process(&mut self, detections: &[DetectionEvent], now: SystemTime) -> FrameOutcome {
        self.run_frame(
            detections.iter().map(|detection| detection.check().map(|_| *detection)),
            now,
        )
    }

    /// Process one frame of wire records, validating each against `labels`
    pub fn process_raw(
        &mut self,
        detections: &[RawDetection],
        labels: Option<&LabelMap>,
        now: SystemTime,
    ) -> FrameOutcome {
        self.run_frame(
            detections
                .iter()
                .map(|raw| DetectionEvent::validate(raw, labels)),
            now,
        )
    }

    /// Process one frame as read off the wire, where records that failed to
    /// decode are already marked as invalid
    pub fn process_records(
        &mut self,
        records: &[DetectionRecord],
        labels: Option<&LabelMap>,
        now: SystemTime,
    ) -> FrameOutcome {
        self.run_frame(
            records.iter().map(|record| match record {
                Ok(raw) => DetectionEvent::validate(raw, labels),
                Err(e) => Err(e.clone()),
            }),
            now,
        )
    }

    /// Reinitialize to the start state.
    ///
    /// A deterrent that was asserted gets an explicit `ClearDeterrent` so the
    /// hardware matches the fresh state.
    pub fn reset(&mut self, now: SystemTime) -> FrameOutcome {
        let mut outcome = FrameOutcome::default();
        let was_deterring = self.state.deterrent_active;
        let previous_feeds = self.state.feed_count;

        self.state = ActuationState::start(Some(now));

        if was_deterring {
            outcome.commands.push(ActuationCommand::ClearDeterrent);
        }
        outcome.statuses.push(StatusMessage::primary("Feeder reset"));
        outcome.statuses.push(StatusMessage::diagnostic(""));

        info!(
            "Controller reset (had issued {} feedings, deterrent {})",
            previous_feeds,
            if was_deterring { "active" } else { "idle" }
        );
        outcome
    }

    /// Undo the most recent feeding after the actuator failed to deliver it,
    /// so the next qualifying detection can try again.
    ///
    /// Returns false when there is no outstanding feeding to roll back.
    pub fn feed_not_delivered(&mut self) -> bool {
        if self.state.feed_ready || self.state.last_feed_time.is_none() {
            return false;
        }

        self.state.feed_ready = true;
        self.state.last_feed_time = self.state.prior_feed_time.take();
        self.state.failed_feeds += 1;

        warn!(
            "Feeding not delivered, feeder re-armed ({} failed so far)",
            self.state.failed_feeds
        );
        true
    }

    fn run_frame<I>(&mut self, detections: I, now: SystemTime) -> FrameOutcome
    where
        I: IntoIterator<Item = Result<DetectionEvent, DetectionError>>,
    {
        let mut outcome = FrameOutcome::default();
        self.observe_clock(now, &mut outcome);

        let settings = self.settings;
        let state = &mut self.state;

        if let Some(last_feed) = state.last_feed_time {
            if is_cooldown_expired(last_feed, now, settings.feed_cooldown) {
                state.feed_ready = true;
            }
        }

        if state.deterrent_active {
            let departed = state
                .last_deterrent_sighting
                .map_or(true, |seen| is_cooldown_expired(seen, now, settings.deterrent_cooldown));

            if departed {
                state.deterrent_active = false;
                outcome.emit(
                    ActuationCommand::ClearDeterrent,
                    StatusMessage::primary("Intruder departed"),
                );
                info!("Intruder departed, clearing deterrent");
            }
        }

        for detection in detections {
            let detection = match detection {
                Ok(detection) => detection,
                Err(e) => {
                    warn!("Skipping invalid detection: {}", e);
                    outcome
                        .statuses
                        .push(StatusMessage::diagnostic(format!("Invalid detection: {}", e)));
                    outcome.rejected.push(e);
                    continue;
                }
            };

            if detection.confidence <= settings.confidence_threshold {
                continue;
            }

            match settings.species.classify(detection.class_id) {
                Species::Intruder => {
                    state.deterrent_active = true;
                    state.last_deterrent_sighting = Some(now);
                    outcome.emit(
                        ActuationCommand::AssertDeterrent,
                        StatusMessage::primary("Intruder detected"),
                    );
                    info!("Intruder detected: {}", detection);
                }
                Species::FeedTarget if state.feed_ready => {
                    state.prior_feed_time = state.last_feed_time;
                    state.last_feed_time = Some(now);
                    state.feed_ready = false;
                    state.feed_count += 1;
                    outcome.emit(ActuationCommand::Feed, StatusMessage::primary("Feeding"));
                    info!("Feeding #{} triggered by {}", state.feed_count, detection);
                }
                Species::FeedTarget => {
                    debug!("Feed target seen during cooldown: {}", detection);
                }
                Species::Other(class_id) => {
                    debug!("Ignoring class {}", class_id);
                }
            }
        }

        outcome
    }

    fn observe_clock(&mut self, now: SystemTime, outcome: &mut FrameOutcome) {
        if let Some(previous) = self.state.last_observed {
            if now < previous {
                let behind = previous.duration_since(now).unwrap_or_default();
                warn!("Clock moved backwards by {:?}, cooldowns held", behind);
                outcome.clock_anomaly = true;
                outcome
                    .statuses
                    .push(StatusMessage::diagnostic("Clock moved backwards"));
            }
        }
        self.state.last_observed = Some(now);
    }
}

impl Default for ActuationController {
    fn default() -> Self {
        Self::new(ControllerSettings::default())
    }
}
