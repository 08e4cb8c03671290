// src/exec/stats.rs

//! Per-thread time accounting for a plan run.
//!
//! Each worker (and the queuer) keeps plain local counters while it loops and
//! publishes a single [`WorkerStats`] entry when its loop ends. The collector
//! is guarded by its own small lock, distinct from the coordination gate,
//! since entries are only appended and read back after the run.

use std::time::Duration;

use parking_lot::Mutex;

/// Immutable time split for one executor thread.
///
/// `busy` is time spent inside node execution, `wait` is time spent in the
/// plan's selection/enumeration step, and `idle` is everything else in the
/// thread's lifetime.
#[derive(Debug, Clone)]
pub struct WorkerStats {
    pub label: String,
    pub busy: Duration,
    pub idle: Duration,
    pub wait: Duration,
}

impl WorkerStats {
    pub fn total(&self) -> Duration {
        self.busy + self.idle + self.wait
    }
}

/// Append-only list of per-thread stats, accumulated across runs.
#[derive(Default)]
pub struct StatsCollector {
    entries: Mutex<Vec<WorkerStats>>,
}

impl StatsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish one thread's final split. `idle` is derived from the total so
    /// the three buckets always sum to the thread's lifetime.
    pub fn record(&self, label: String, total: Duration, busy: Duration, wait: Duration) {
        let idle = total.saturating_sub(busy).saturating_sub(wait);
        self.entries.lock().push(WorkerStats {
            label,
            busy,
            idle,
            wait,
        });
    }

    /// Snapshot of all entries recorded so far.
    pub fn snapshot(&self) -> Vec<WorkerStats> {
        self.entries.lock().clone()
    }
}
