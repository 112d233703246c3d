use std::time::{Duration, Instant, SystemTime};

/// True once at least `window` has elapsed since `last`.
///
/// A clock that moved backwards (`now < last`) never counts as expired; the
/// window only starts counting again once `now` has caught up with `last`.
pub fn is_cooldown_expired(last: SystemTime, now: SystemTime, window: Duration) -> bool {
    match now.duration_since(last) {
        Ok(elapsed) => elapsed >= window,
        Err(_) => false,
    }
}

/// Drops edges that arrive within `window` of the last accepted one
#[derive(Debug, Clone)]
pub struct Debouncer {
    window: Duration,
    last_accepted: Option<Instant>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_accepted: None,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn accept(&mut self) -> bool {
        self.accept_at(Instant::now())
    }

    pub fn accept_at(&mut self, now: Instant) -> bool {
        if let Some(last) = self.last_accepted {
            if now.saturating_duration_since(last) < self.window {
                return false;
            }
        }
        self.last_accepted = Some(now);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::UNIX_EPOCH;

    fn at(secs: u64) -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(secs)
    }

    #[test]
    fn test_cooldown_boundaries() {
        let window = Duration::from_secs(10);
        assert!(!is_cooldown_expired(at(100), at(100), window));
        assert!(!is_cooldown_expired(at(100), at(109), window));
        assert!(is_cooldown_expired(at(100), at(110), window));
        assert!(is_cooldown_expired(at(100), at(500), window));
    }

    #[test]
    fn test_zero_window_expires_immediately() {
        assert!(is_cooldown_expired(at(5), at(5), Duration::ZERO));
    }

    #[test]
    fn test_backwards_clock_is_not_expired() {
        let window = Duration::from_secs(10);
        assert!(!is_cooldown_expired(at(100), at(50), window));
        assert!(!is_cooldown_expired(at(100), at(99), Duration::ZERO));
    }

    #[test]
    fn test_debouncer_window() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(Duration::from_millis(100));

        assert!(debouncer.accept_at(start));
        assert!(!debouncer.accept_at(start + Duration::from_millis(20)));
        assert!(!debouncer.accept_at(start + Duration::from_millis(99)));
        assert!(debouncer.accept_at(start + Duration::from_millis(100)));
        assert!(!debouncer.accept_at(start + Duration::from_millis(150)));
    }
}
