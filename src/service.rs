//! Single task owning the controller.
//!
//! Frames and reset requests arrive on separate channels and are applied one
//! at a time, so a reset can never interleave with a half-applied frame.
//! Pending resets always win over pending frames.

use crate::actuator::Actuator;
use crate::controller::{ActuationCommand, ActuationController, FrameOutcome, DIAGNOSTIC_LINE};
use crate::detection::LabelMap;
use crate::events::{EventBus, FeederEvent};
use crate::source::FrameBatch;
use crate::status::StatusBoard;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

pub trait Clock: Send + Sync {
    fn now(&self) -> SystemTime;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }
}

/// Clock that only moves when told to
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<SystemTime>>,
}

impl ManualClock {
    pub fn new(start: SystemTime) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    pub fn set(&self, now: SystemTime) {
        *self.now.lock() = now;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock();
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> SystemTime {
        *self.now.lock()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetSource {
    Button,
    Keyboard,
    Internal,
}

impl fmt::Display for ResetSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResetSource::Button => "button",
            ResetSource::Keyboard => "keyboard",
            ResetSource::Internal => "internal",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResetRequest {
    pub source: ResetSource,
}

/// Cloneable, non-blocking entry point for reset requests.
/// Safe to call from any thread, including blocking input loops.
#[derive(Clone)]
pub struct ResetHandle {
    sender: mpsc::Sender<ResetRequest>,
}

impl ResetHandle {
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<ResetRequest>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (Self { sender }, receiver)
    }

    /// Queue a reset. A full queue already holds a pending reset, which has
    /// the same effect, so the request still counts as accepted. Returns
    /// false only once the controller task is gone.
    pub fn request(&self, source: ResetSource) -> bool {
        match self.sender.try_send(ResetRequest { source }) {
            Ok(()) => {
                debug!("Reset requested by {}", source);
                true
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                debug!("Reset from {} coalesced with a pending one", source);
                true
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                warn!("Reset from {} dropped, controller stopped", source);
                false
            }
        }
    }
}

/// Counters kept by the controller task
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceStats {
    pub frames_processed: u64,
    pub detections_seen: u64,
    pub detections_rejected: u64,
    pub feeds_issued: u64,
    pub feeds_failed: u64,
    pub deterrent_raised: u64,
    pub deterrent_cleared: u64,
    pub resets: u64,
    pub actuator_failures: u64,
    pub clock_anomalies: u64,
}

impl fmt::Display for ServiceStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} frames, {} detections ({} rejected), {} feedings ({} failed), \
             {} deterrent raises, {} resets, {} actuator failures",
            self.frames_processed,
            self.detections_seen,
            self.detections_rejected,
            self.feeds_issued,
            self.feeds_failed,
            self.deterrent_raised,
            self.resets,
            self.actuator_failures
        )
    }
}

pub struct ActuationService {
    controller: ActuationController,
    labels: Option<LabelMap>,
    actuator: Arc<dyn Actuator>,
    board: StatusBoard,
    event_bus: Arc<EventBus>,
    clock: Arc<dyn Clock>,
    /// Timestamp carried by the most recent frame, if it had one
    stream_time: Option<SystemTime>,
    stats: ServiceStats,
}

impl ActuationService {
    pub fn new(
        controller: ActuationController,
        actuator: Arc<dyn Actuator>,
        board: StatusBoard,
        event_bus: Arc<EventBus>,
    ) -> Self {
        Self {
            controller,
            labels: None,
            actuator,
            board,
            event_bus,
            clock: Arc::new(SystemClock),
            stream_time: None,
            stats: ServiceStats::default(),
        }
    }

    pub fn with_labels(mut self, labels: LabelMap) -> Self {
        self.labels = Some(labels);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn controller(&self) -> &ActuationController {
        &self.controller
    }

    pub fn stats(&self) -> &ServiceStats {
        &self.stats
    }

    /// Serve frames and resets until cancelled or the frame stream ends
    pub async fn run(
        mut self,
        mut frames: mpsc::Receiver<FrameBatch>,
        mut resets: mpsc::Receiver<ResetRequest>,
        cancel: CancellationToken,
    ) -> ServiceStats {
        info!("Actuation controller running");
        self.board.refresh_idle(false);
        let mut resets_open = true;

        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => {
                    debug!("Actuation controller cancelled");
                    break;
                }
                request = resets.recv(), if resets_open => match request {
                    Some(request) => {
                        self.handle_reset(request).await;
                    }
                    None => {
                        debug!("Reset channel closed");
                        resets_open = false;
                    }
                },
                batch = frames.recv() => match batch {
                    Some(batch) => {
                        self.handle_frame(batch).await;
                    }
                    None => {
                        info!("Detection stream closed");
                        break;
                    }
                },
            }
        }

        self.release_outputs().await;
        info!("Actuation controller stopped: {}", self.stats);
        self.stats
    }

    pub async fn handle_frame(&mut self, batch: FrameBatch) -> FrameOutcome {
        self.stream_time = batch.timestamp;
        let now = batch.timestamp.unwrap_or_else(|| self.clock.now());

        self.stats.frames_processed += 1;
        self.stats.detections_seen += batch.detections.len() as u64;

        if let Some(labels) = &self.labels {
            for detection in batch.detections.iter().flatten() {
                if let Some(name) = u32::try_from(detection.class_id)
                    .ok()
                    .and_then(|id| labels.name(id))
                {
                    debug!(
                        frame = batch.sequence,
                        "{} score = {:.3}", name, detection.confidence
                    );
                }
            }
        }

        let outcome =
            self.controller
                .process_records(&batch.detections, self.labels.as_ref(), now);
        self.apply(outcome, now).await
    }

    pub async fn handle_reset(&mut self, request: ResetRequest) -> FrameOutcome {
        // While replaying, stay on the stream's clock so the next frame
        // does not look like a jump backwards
        let now = self.stream_time.unwrap_or_else(|| self.clock.now());
        info!("Reset requested by {}", request.source);

        let outcome = self.controller.reset(now);
        self.stats.resets += 1;
        let _ = self
            .event_bus
            .publish(FeederEvent::ResetPerformed { timestamp: now });

        self.apply(outcome, now).await
    }

    async fn apply(&mut self, outcome: FrameOutcome, now: SystemTime) -> FrameOutcome {
        for status in &outcome.statuses {
            self.board.apply(status);
        }

        for command in &outcome.commands {
            match self.actuator.execute(*command).await {
                Ok(()) => self.record_delivery(*command, now),
                Err(e) => {
                    self.stats.actuator_failures += 1;
                    error!("{} actuator failed on {}: {}", self.actuator.name(), command, e);
                    self.board
                        .show(DIAGNOSTIC_LINE, &format!("Actuator failure: {}", command));

                    if *command == ActuationCommand::Feed && self.controller.feed_not_delivered() {
                        self.stats.feeds_failed += 1;
                    }

                    let _ = self.event_bus.publish(FeederEvent::ActuatorFailed {
                        command: *command,
                        error: e.to_string(),
                    });
                }
            }
        }

        for rejected in &outcome.rejected {
            self.stats.detections_rejected += 1;
            let _ = self.event_bus.publish(FeederEvent::InvalidDetection {
                reason: rejected.to_string(),
            });
        }

        if outcome.clock_anomaly {
            self.stats.clock_anomalies += 1;
            let _ = self
                .event_bus
                .publish(FeederEvent::ClockAnomaly { timestamp: now });
        }

        self.board
            .refresh_idle(self.controller.state().deterrent_active);
        outcome
    }

    fn record_delivery(&mut self, command: ActuationCommand, now: SystemTime) {
        let event = match command {
            ActuationCommand::Feed => {
                self.stats.feeds_issued += 1;
                FeederEvent::FeedingTriggered {
                    feed_count: self.controller.state().feed_count,
                    timestamp: now,
                }
            }
            ActuationCommand::AssertDeterrent => {
                self.stats.deterrent_raised += 1;
                FeederEvent::DeterrentRaised { timestamp: now }
            }
            ActuationCommand::ClearDeterrent => {
                self.stats.deterrent_cleared += 1;
                FeederEvent::DeterrentCleared { timestamp: now }
            }
        };
        let _ = self.event_bus.publish(event);
    }

    /// Leave every output low when the controller stops
    async fn release_outputs(&mut self) {
        if self.controller.state().deterrent_active {
            match self.actuator.execute(ActuationCommand::ClearDeterrent).await {
                Ok(()) => {
                    self.stats.deterrent_cleared += 1;
                    info!("Deterrent cleared on shutdown");
                }
                Err(e) => error!("Failed to clear deterrent on shutdown: {}", e),
            }
        }

        if let Err(e) = self.actuator.release().await {
            error!("Failed to release {} actuator: {}", self.actuator.name(), e);
        }
    }
}
