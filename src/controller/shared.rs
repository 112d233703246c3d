use super::{ActuationController, ActuationState, FrameOutcome};
use crate::detection::{DetectionEvent, DetectionRecord, LabelMap, RawDetection};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::SystemTime;

/// Controller behind a single lock, for callers that live on their own threads
/// (e.g. a GPIO interrupt callback next to a frame loop). A `reset` either
/// lands before or after a `process`, never in the middle of one.
#[derive(Clone)]
pub struct SharedController {
    inner: Arc<Mutex<ActuationController>>,
}

impl SharedController {
    pub fn new(controller: ActuationController) -> Self {
        Self {
            inner: Arc::new(Mutex::new(controller)),
        }
    }

    pub fn process(&self, detections: &[DetectionEvent], now: SystemTime) -> FrameOutcome {
        self.inner.lock().process(detections, now)
    }

    pub fn process_raw(
        &self,
        detections: &[RawDetection],
        labels: Option<&LabelMap>,
        now: SystemTime,
    ) -> FrameOutcome {
        self.inner.lock().process_raw(detections, labels, now)
    }

    pub fn process_records(
        &self,
        records: &[DetectionRecord],
        labels: Option<&LabelMap>,
        now: SystemTime,
    ) -> FrameOutcome {
        self.inner.lock().process_records(records, labels, now)
    }

    pub fn reset(&self, now: SystemTime) -> FrameOutcome {
        self.inner.lock().reset(now)
    }

    pub fn feed_not_delivered(&self) -> bool {
        self.inner.lock().feed_not_delivered()
    }

    /// Copy of the current state
    pub fn snapshot(&self) -> ActuationState {
        self.inner.lock().state().clone()
    }
}
