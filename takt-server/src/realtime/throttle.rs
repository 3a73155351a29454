//! Broadcast throttle
//!
//! Coalesces bursts of "something changed" signals into at most one
//! emission per interval. Dropping a notification is safe because the
//! payload is always the current full state, never a diff; the guarded
//! compare-and-update happens under one lock hold so two callers can
//! never both decide it is their turn (or both decide to skip).

use std::sync::Mutex;
use std::time::{Duration, Instant};

pub struct BroadcastThrottler {
    min_interval: Duration,
    last_emit: Mutex<Option<Instant>>,
}

impl BroadcastThrottler {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_emit: Mutex::new(None),
        }
    }

    /// Decide whether the caller may emit now
    ///
    /// `force` bypasses the interval check but still records the
    /// emission instant. Returns false when the notification should be
    /// dropped.
    pub fn should_emit(&self, force: bool) -> bool {
        let mut last = self.last_emit.lock().unwrap();
        let now = Instant::now();
        let due = match *last {
            Some(at) => now.duration_since(at) >= self.min_interval,
            None => true,
        };

        if force || due {
            *last = Some(now);
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_notify_emits() {
        let throttler = BroadcastThrottler::new(Duration::from_millis(50));
        assert!(throttler.should_emit(false));
    }

    #[test]
    fn test_burst_collapses_to_one_emission() {
        let throttler = BroadcastThrottler::new(Duration::from_millis(200));

        let emitted = (0..10).filter(|_| throttler.should_emit(false)).count();
        assert_eq!(emitted, 1);
    }

    #[test]
    fn test_emits_again_after_interval() {
        let throttler = BroadcastThrottler::new(Duration::from_millis(20));

        assert!(throttler.should_emit(false));
        assert!(!throttler.should_emit(false));

        std::thread::sleep(Duration::from_millis(30));
        assert!(throttler.should_emit(false));
        assert!(!throttler.should_emit(false));
    }

    #[test]
    fn test_force_bypasses_interval() {
        let throttler = BroadcastThrottler::new(Duration::from_secs(60));

        assert!(throttler.should_emit(false));
        assert!(!throttler.should_emit(false));
        assert!(throttler.should_emit(true));
    }

    #[test]
    fn test_concurrent_callers_one_winner() {
        use std::sync::Arc;

        let throttler = Arc::new(BroadcastThrottler::new(Duration::from_secs(60)));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let throttler = throttler.clone();
                std::thread::spawn(move || throttler.should_emit(false))
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|emitted| *emitted)
            .count();
        assert_eq!(winners, 1);
    }
}
