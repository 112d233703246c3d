use crate::cooldown::Debouncer;
use crate::service::{ResetHandle, ResetSource};
use parking_lot::Mutex;
use std::time::{Duration, Instant};
use tracing::debug;

/// Mock reset button for testing without real hardware
pub struct MockButton {
    reset: ResetHandle,
    debouncer: Mutex<Debouncer>,
}

impl MockButton {
    pub fn new(reset: ResetHandle, debounce: Duration) -> Self {
        Self {
            reset,
            debouncer: Mutex::new(Debouncer::new(debounce)),
        }
    }

    /// Press the button now; returns whether a reset was queued
    pub fn press(&self) -> bool {
        self.press_at(Instant::now())
    }

    pub fn press_at(&self, at: Instant) -> bool {
        if !self.debouncer.lock().accept_at(at) {
            debug!("Mock button press debounced");
            return false;
        }
        self.reset.request(ResetSource::Button)
    }
}
