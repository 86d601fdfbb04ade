//! The producer loop: collect, build, compare, install, publish.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{interval, sleep, timeout, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::broadcaster::{Broadcaster, Notification, PublishReport, DEFAULT_SESSION_BUFFER};
use crate::builder::build_snapshot;
use crate::collector::Collector;
use crate::detector::ChangeSummary;
use crate::error::CollectionError;
use crate::stats::PipelineStats;
use crate::store::StateStore;

/// Tuning for the producer loop.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Time between collections in polling mode.
    pub interval: Duration,
    /// Window for coalescing bursts of watch triggers into one fetch.
    pub debounce: Duration,
    /// Upper bound on a single `fetch()`.
    pub fetch_timeout: Duration,
    /// Per-session notification buffer.
    pub session_buffer: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            debounce: Duration::from_millis(250),
            fetch_timeout: Duration::from_secs(30),
            session_buffer: DEFAULT_SESSION_BUFFER,
        }
    }
}

impl PipelineConfig {
    /// Set the polling interval.
    #[must_use]
    pub const fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Set the trigger debounce window.
    #[must_use]
    pub const fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    /// Set the fetch timeout.
    #[must_use]
    pub const fn with_fetch_timeout(mut self, fetch_timeout: Duration) -> Self {
        self.fetch_timeout = fetch_timeout;
        self
    }

    /// Set the per-session buffer size.
    #[must_use]
    pub const fn with_session_buffer(mut self, session_buffer: usize) -> Self {
        self.session_buffer = session_buffer;
        self
    }
}

/// What one collection cycle did.
#[derive(Debug, Clone)]
pub enum CycleOutcome {
    /// A new state was installed and a notification published.
    Changed {
        /// Store generation after the install.
        generation: u64,
        /// Result of the publish.
        report: PublishReport,
    },
    /// The collected state matched the cached one.
    Unchanged,
    /// Collection failed; nothing was touched.
    Skipped(CollectionError),
}

impl CycleOutcome {
    /// Check if the cycle installed a new state.
    #[must_use]
    pub fn is_changed(&self) -> bool {
        matches!(self, Self::Changed { .. })
    }
}

/// Drives collection into the store and broadcaster.
///
/// Cloning yields another handle to the same store, broadcaster and stats.
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PipelineConfig,
    store: Arc<StateStore>,
    broadcaster: Broadcaster,
    stats: Arc<PipelineStats>,
}

impl Pipeline {
    /// Create a pipeline with an empty store and a fresh broadcaster.
    #[must_use]
    pub fn new(config: PipelineConfig) -> Self {
        let broadcaster = Broadcaster::new(config.session_buffer);
        Self::with_parts(config, Arc::new(StateStore::new()), broadcaster)
    }

    /// Create a pipeline around an existing store and broadcaster.
    #[must_use]
    pub fn with_parts(
        config: PipelineConfig,
        store: Arc<StateStore>,
        broadcaster: Broadcaster,
    ) -> Self {
        Self {
            config,
            store,
            broadcaster,
            stats: Arc::new(PipelineStats::new()),
        }
    }

    /// Pipeline configuration.
    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// The state store.
    #[must_use]
    pub fn store(&self) -> Arc<StateStore> {
        Arc::clone(&self.store)
    }

    /// The broadcaster.
    #[must_use]
    pub fn broadcaster(&self) -> Broadcaster {
        self.broadcaster.clone()
    }

    /// Cycle counters.
    #[must_use]
    pub fn stats(&self) -> Arc<PipelineStats> {
        Arc::clone(&self.stats)
    }

    /// Run one collect/build/compare/install/publish cycle.
    ///
    /// A failed fetch or malformed data skips the cycle; the cached state
    /// is never cleared because of a failure.
    pub async fn run_cycle<C: Collector + ?Sized>(&self, collector: &C) -> CycleOutcome {
        self.stats.record_cycle();

        let fetched = match timeout(self.config.fetch_timeout, collector.fetch()).await {
            Ok(result) => result,
            Err(_) => Err(CollectionError::Timeout(self.config.fetch_timeout)),
        };

        let candidate = match fetched.and_then(|raw| build_snapshot(raw).map_err(CollectionError::from)) {
            Ok(state) => state,
            Err(e) => {
                warn!(collector = collector.name(), error = %e, "collection failed, keeping cached state");
                self.stats.record_failure(e.to_string());
                return CycleOutcome::Skipped(e);
            }
        };

        let previous = self.store.snapshot();
        let nodes = candidate.node_count();
        let workloads = candidate.workload_count();

        if !self.store.swap_if_changed(candidate) {
            debug!(nodes, workloads, "cluster state unchanged");
            return CycleOutcome::Unchanged;
        }

        let current = self.store.versioned();
        let generation = current.generation;
        self.stats.record_change();

        let summary = current
            .state
            .as_deref()
            .map(|next| ChangeSummary::between(previous.as_deref(), next))
            .unwrap_or_default();

        let report = self.broadcaster.publish(Notification { generation });
        info!(
            generation,
            nodes,
            workloads,
            changes = %summary,
            sessions = report.delivered,
            dropped = report.dropped,
            "cluster state changed"
        );

        CycleOutcome::Changed { generation, report }
    }

    /// Collect on a fixed interval until `shutdown` is cancelled.
    ///
    /// The first cycle runs immediately.
    pub async fn run_polling<C: Collector + ?Sized>(
        &self,
        collector: &C,
        shutdown: CancellationToken,
    ) {
        let mut ticker = interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(collector = collector.name(), interval = ?self.config.interval, "polling started");

        loop {
            tokio::select! {
                biased;
                () = shutdown.cancelled() => break,
                _ = ticker.tick() => {}
            }
            tokio::select! {
                biased;
                () = shutdown.cancelled() => break,
                _ = self.run_cycle(collector) => {}
            }
        }

        info!(collector = collector.name(), "polling stopped");
    }

    /// Collect whenever a trigger arrives, until `shutdown` is cancelled or
    /// the trigger source goes away.
    ///
    /// One cycle runs at start so the store is seeded before the first
    /// trigger. Triggers arriving within the debounce window after the first
    /// one are folded into a single fetch.
    pub async fn run_triggered<C: Collector + ?Sized>(
        &self,
        collector: &C,
        mut triggers: mpsc::Receiver<()>,
        shutdown: CancellationToken,
    ) {
        info!(collector = collector.name(), debounce = ?self.config.debounce, "triggered collection started");

        tokio::select! {
            biased;
            () = shutdown.cancelled() => return,
            _ = self.run_cycle(collector) => {}
        }

        loop {
            let triggered = tokio::select! {
                biased;
                () = shutdown.cancelled() => break,
                trigger = triggers.recv() => trigger.is_some(),
            };
            if !triggered {
                warn!("trigger source closed, stopping triggered collection");
                break;
            }

            tokio::select! {
                biased;
                () = shutdown.cancelled() => break,
                () = sleep(self.config.debounce) => {}
            }
            let mut coalesced = 1usize;
            while triggers.try_recv().is_ok() {
                coalesced += 1;
            }
            debug!(coalesced, "collecting after triggers");

            tokio::select! {
                biased;
                () = shutdown.cancelled() => break,
                _ = self.run_cycle(collector) => {}
            }
        }

        info!(collector = collector.name(), "triggered collection stopped");
    }
}
