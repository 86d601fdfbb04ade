//! Counters describing what the producer loop has done.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;

/// The most recent failed cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureRecord {
    /// When the failure was recorded.
    pub at: DateTime<Utc>,
    /// Error message.
    pub message: String,
}

/// Live counters, shared between the producer and readers.
#[derive(Debug, Default)]
pub struct PipelineStats {
    cycles: AtomicU64,
    changes: AtomicU64,
    failures: AtomicU64,
    last_failure: Mutex<Option<FailureRecord>>,
    last_change_at: Mutex<Option<DateTime<Utc>>>,
}

impl PipelineStats {
    /// Create zeroed counters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_cycle(&self) {
        self.cycles.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_change(&self) {
        self.changes.fetch_add(1, Ordering::Relaxed);
        *self.last_change_at.lock() = Some(Utc::now());
    }

    pub(crate) fn record_failure(&self, message: String) {
        self.failures.fetch_add(1, Ordering::Relaxed);
        *self.last_failure.lock() = Some(FailureRecord {
            at: Utc::now(),
            message,
        });
    }

    /// Copy the counters out.
    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            cycles: self.cycles.load(Ordering::Relaxed),
            changes: self.changes.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            last_failure: self.last_failure.lock().clone(),
            last_change_at: *self.last_change_at.lock(),
        }
    }
}

/// Point-in-time copy of [`PipelineStats`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    /// Collection cycles started.
    pub cycles: u64,
    /// Cycles that installed a new state.
    pub changes: u64,
    /// Cycles skipped because collection failed.
    pub failures: u64,
    /// Most recent failure, if any.
    pub last_failure: Option<FailureRecord>,
    /// When the last change was installed.
    pub last_change_at: Option<DateTime<Utc>>,
}
