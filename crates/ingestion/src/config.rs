//! Adapter metrics

use std::sync::atomic::{AtomicU64, Ordering};

/// Per-adapter event counters
#[derive(Debug, Default)]
pub struct AdapterMetrics {
    /// Events delivered by the native source
    pub events_received: AtomicU64,

    /// Events handed to the subscriber
    pub events_forwarded: AtomicU64,

    /// Events arriving after cancellation (dropped, resources released)
    pub events_discarded: AtomicU64,

    /// `Failed` events seen
    pub faults: AtomicU64,

    /// `Completed` events seen
    pub completions: AtomicU64,
}

impl AdapterMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_received(&self) {
        self.events_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_forwarded(&self) {
        self.events_forwarded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_discarded(&self) {
        self.events_discarded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_fault(&self) {
        self.faults.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_completion(&self) {
        self.completions.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            events_received: self.events_received.load(Ordering::Relaxed),
            events_forwarded: self.events_forwarded.load(Ordering::Relaxed),
            events_discarded: self.events_discarded.load(Ordering::Relaxed),
            faults: self.faults.load(Ordering::Relaxed),
            completions: self.completions.load(Ordering::Relaxed),
        }
    }
}

/// Metrics snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub events_received: u64,
    pub events_forwarded: u64,
    pub events_discarded: u64,
    pub faults: u64,
    pub completions: u64,
}
