//! Dispatcher metrics tracking

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters updated by the dispatcher and its workers
#[derive(Debug, Default)]
pub struct DispatcherMetrics {
    /// Records accepted into the queue
    queued: AtomicU64,
    /// Lines successfully emitted
    emitted: AtomicU64,
    /// Bodies that could not be rendered
    render_failures: AtomicU64,
    /// Emit calls that failed
    sink_failures: AtomicU64,
    /// Logging units that panicked
    panics: AtomicU64,
    /// Records dropped because the queue was full or closed
    dropped: AtomicU64,
}

impl DispatcherMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_queued(&self) {
        self.queued.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_emitted(&self) {
        self.emitted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_render_failure(&self) {
        self.render_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_sink_failure(&self) {
        self.sink_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_panic(&self) {
        self.panics.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns a point-in-time copy of all counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            queued: self.queued.load(Ordering::Relaxed),
            emitted: self.emitted.load(Ordering::Relaxed),
            render_failures: self.render_failures.load(Ordering::Relaxed),
            sink_failures: self.sink_failures.load(Ordering::Relaxed),
            panics: self.panics.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time dispatcher counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    /// Records accepted into the queue
    pub queued: u64,
    /// Lines successfully emitted
    pub emitted: u64,
    /// Bodies that could not be rendered
    pub render_failures: u64,
    /// Emit calls that failed
    pub sink_failures: u64,
    /// Logging units that panicked
    pub panics: u64,
    /// Records dropped before reaching a worker
    pub dropped: u64,
}

impl MetricsSnapshot {
    /// Records that reached a worker and failed in any way.
    pub fn failures(&self) -> u64 {
        self.render_failures + self.sink_failures + self.panics
    }
}
