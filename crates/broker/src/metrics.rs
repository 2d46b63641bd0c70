//! Broker counters for observability

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Counters shared by the run loop, schedulers and workers
#[derive(Debug, Default)]
pub struct BrokerMetrics {
    /// Fire events pushed onto the dispatch queue
    fires: AtomicU64,
    /// Firings admitted by a publish worker
    firings: AtomicU64,
    /// Serialized firings dropped because one was already waiting
    firings_coalesced: AtomicU64,
    /// Firings dropped because the source failed
    collection_failures: AtomicU64,
    /// Successful sink calls
    batches_published: AtomicU64,
    /// Failed sink calls
    publish_failures: AtomicU64,
    /// Points shipped in successful sink calls
    points_published: AtomicU64,
    /// Workers currently running
    workers_in_flight: AtomicUsize,
}

impl BrokerMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fires(&self) -> u64 {
        self.fires.load(Ordering::Relaxed)
    }

    pub fn inc_fires(&self) {
        self.fires.fetch_add(1, Ordering::Relaxed);
    }

    pub fn firings(&self) -> u64 {
        self.firings.load(Ordering::Relaxed)
    }

    pub fn inc_firings(&self) {
        self.firings.fetch_add(1, Ordering::Relaxed);
    }

    pub fn firings_coalesced(&self) -> u64 {
        self.firings_coalesced.load(Ordering::Relaxed)
    }

    pub fn inc_firings_coalesced(&self) {
        self.firings_coalesced.fetch_add(1, Ordering::Relaxed);
    }

    pub fn collection_failures(&self) -> u64 {
        self.collection_failures.load(Ordering::Relaxed)
    }

    pub fn inc_collection_failures(&self) {
        self.collection_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn batches_published(&self) -> u64 {
        self.batches_published.load(Ordering::Relaxed)
    }

    /// Count one successful sink call carrying `points` points
    pub fn record_batch(&self, points: usize) {
        self.batches_published.fetch_add(1, Ordering::Relaxed);
        self.points_published
            .fetch_add(points as u64, Ordering::Relaxed);
    }

    pub fn publish_failures(&self) -> u64 {
        self.publish_failures.load(Ordering::Relaxed)
    }

    pub fn inc_publish_failures(&self) {
        self.publish_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn points_published(&self) -> u64 {
        self.points_published.load(Ordering::Relaxed)
    }

    pub fn workers_in_flight(&self) -> usize {
        self.workers_in_flight.load(Ordering::Relaxed)
    }

    pub fn set_workers_in_flight(&self, count: usize) {
        self.workers_in_flight.store(count, Ordering::Relaxed);
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            fires: self.fires(),
            firings: self.firings(),
            firings_coalesced: self.firings_coalesced(),
            collection_failures: self.collection_failures(),
            batches_published: self.batches_published(),
            publish_failures: self.publish_failures(),
            points_published: self.points_published(),
            workers_in_flight: self.workers_in_flight(),
        }
    }
}

/// Snapshot of broker metrics (for reporting)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub fires: u64,
    pub firings: u64,
    pub firings_coalesced: u64,
    pub collection_failures: u64,
    pub batches_published: u64,
    pub publish_failures: u64,
    pub points_published: u64,
    pub workers_in_flight: usize,
}
