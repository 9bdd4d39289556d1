//! Process-wide counters for the layer engine.
//!
//! Call sites bump a [`Counter`] through [`Metrics::inc`]. Read everything
//! at once with [`Metrics::snapshot`], or log it with [`Metrics::flush`].

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Global metrics singleton.
pub static METRICS: Metrics = Metrics::new();

/// What a counter counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Counter {
    /// Scripting engine invocations for layer rules
    RuleEvaluations,
    WidgetsPlaced,
    /// Metadata snapshots rebuilt from the store
    SnapshotRecomputes,
    /// Assignments skipped because their layer is gone
    StaleAssignments,
}

impl Counter {
    pub fn as_str(&self) -> &'static str {
        match self {
            Counter::RuleEvaluations => "rule_evaluations",
            Counter::WidgetsPlaced => "widgets_placed",
            Counter::SnapshotRecomputes => "snapshot_recomputes",
            Counter::StaleAssignments => "stale_assignments",
        }
    }
}

/// Point-in-time copy of every counter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub rule_evaluations: u64,
    pub widgets_placed: u64,
    pub snapshot_recomputes: u64,
    pub stale_assignments: u64,
}

/// Relaxed atomic counters.
pub struct Metrics {
    counters: [AtomicU64; 4],
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            counters: [
                AtomicU64::new(0),
                AtomicU64::new(0),
                AtomicU64::new(0),
                AtomicU64::new(0),
            ],
        }
    }

    fn slot(&self, counter: Counter) -> &AtomicU64 {
        &self.counters[counter as usize]
    }

    pub fn inc(&self, counter: Counter) {
        self.slot(counter).fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = counter.as_str(), "counter incremented");
    }

    pub fn get(&self, counter: Counter) -> u64 {
        self.slot(counter).load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            rule_evaluations: self.get(Counter::RuleEvaluations),
            widgets_placed: self.get(Counter::WidgetsPlaced),
            snapshot_recomputes: self.get(Counter::SnapshotRecomputes),
            stale_assignments: self.get(Counter::StaleAssignments),
        }
    }

    /// Log every counter as one `info!` event and return the values.
    pub fn flush(&self) -> MetricsSnapshot {
        let snapshot = self.snapshot();
        tracing::info!(
            metric = "flush",
            rule_evaluations = snapshot.rule_evaluations,
            widgets_placed = snapshot.widgets_placed,
            snapshot_recomputes = snapshot.snapshot_recomputes,
            stale_assignments = snapshot.stale_assignments,
        );
        snapshot
    }

    pub fn reset(&self) {
        for counter in &self.counters {
            counter.store(0, Ordering::Relaxed);
        }
    }
}
