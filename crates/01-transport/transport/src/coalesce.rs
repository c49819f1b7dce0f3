//! Producer-side rate limiting for high-frequency, low-value events.
//!
//! The dispatch queue delivers every accepted event, so noisy kinds such as
//! head-poll notifications are thinned out before they are enqueued.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Slots tracked individually. Larger slot values are never gated.
const GATED_SLOTS: usize = 8;
const NEVER: u64 = u64::MAX;

/// Admits at most one event per slot within each interval.
#[derive(Debug)]
pub struct RateGate {
    epoch: Instant,
    interval_us: u64,
    last: [AtomicU64; GATED_SLOTS],
}

impl RateGate {
    /// A zero interval admits everything.
    pub fn new(interval: Duration) -> Self {
        Self {
            epoch: Instant::now(),
            interval_us: interval.as_micros().min(u128::from(u64::MAX - 1)) as u64,
            last: std::array::from_fn(|_| AtomicU64::new(NEVER)),
        }
    }

    /// Returns `true` if an event for `slot` should be enqueued now.
    pub fn admit(&self, slot: u32) -> bool {
        self.admit_at(slot, self.epoch.elapsed())
    }

    fn admit_at(&self, slot: u32, now: Duration) -> bool {
        if self.interval_us == 0 {
            return true;
        }
        let Some(cell) = self.last.get(slot as usize) else {
            return true;
        };
        let now_us = now.as_micros() as u64;
        let prev = cell.load(Ordering::Relaxed);
        if prev != NEVER && now_us.saturating_sub(prev) < self.interval_us {
            return false;
        }
        cell.compare_exchange(prev, now_us, Ordering::Relaxed, Ordering::Relaxed)
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admits_once_per_interval_per_slot() {
        let gate = RateGate::new(Duration::from_millis(100));
        assert!(gate.admit_at(0, Duration::from_millis(5)));
        assert!(!gate.admit_at(0, Duration::from_millis(50)));
        assert!(gate.admit_at(1, Duration::from_millis(50)));
        assert!(gate.admit_at(0, Duration::from_millis(105)));
    }

    #[test]
    fn zero_interval_disables_gating() {
        let gate = RateGate::new(Duration::ZERO);
        for _ in 0..4 {
            assert!(gate.admit_at(2, Duration::from_millis(1)));
        }
    }

    #[test]
    fn untracked_slots_pass_through() {
        let gate = RateGate::new(Duration::from_secs(1));
        assert!(gate.admit_at(99, Duration::ZERO));
        assert!(gate.admit_at(99, Duration::ZERO));
    }
}
