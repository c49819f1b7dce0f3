//! Counters for the dispatch queue.

use std::sync::atomic::{AtomicU64, Ordering};

/// Result of handing one event to the dispatch queue.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EmitOutcome {
    /// Event entered the current listener's queue.
    Accepted,
    /// Event was folded into a recent one of the same kind and slot.
    Coalesced,
    /// No listener was registered; the event was dropped.
    Unobserved,
}

#[derive(Debug, Default)]
pub(crate) struct DispatchMetrics {
    accepted: AtomicU64,
    coalesced: AtomicU64,
    unobserved: AtomicU64,
    delivered: AtomicU64,
    discarded: AtomicU64,
}

impl DispatchMetrics {
    pub(crate) fn record(&self, outcome: EmitOutcome) {
        let counter = match outcome {
            EmitOutcome::Accepted => &self.accepted,
            EmitOutcome::Coalesced => &self.coalesced,
            EmitOutcome::Unobserved => &self.unobserved,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_delivered(&self, count: usize) {
        self.delivered.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_discarded(&self, count: usize) {
        self.discarded.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> DispatchMetricsSnapshot {
        DispatchMetricsSnapshot {
            accepted: self.accepted.load(Ordering::Relaxed),
            coalesced: self.coalesced.load(Ordering::Relaxed),
            unobserved: self.unobserved.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            discarded: self.discarded.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of the dispatch counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DispatchMetricsSnapshot {
    pub accepted: u64,
    pub coalesced: u64,
    pub unobserved: u64,
    /// Events handed to the consumer.
    pub delivered: u64,
    /// Events dropped because their registration ended before delivery.
    pub discarded: u64,
}
