//! Test doubles for the collector contract.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use pulse_proto::RawSnapshot;

use crate::collector::{CollectFuture, Collector};
use crate::error::{CollectionError, CollectionResult};

/// A collector whose next answer is set by the test.
///
/// Every `fetch()` returns a clone of the current answer until it is
/// replaced with [`set`](Self::set) or [`fail`](Self::fail).
#[derive(Debug)]
pub struct ScriptedCollector {
    answer: Mutex<CollectionResult<RawSnapshot>>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl ScriptedCollector {
    /// Create a collector that returns `snapshot`.
    #[must_use]
    pub fn new(snapshot: RawSnapshot) -> Self {
        Self {
            answer: Mutex::new(Ok(snapshot)),
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Sleep for `delay` inside every fetch.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Return `snapshot` from now on.
    pub fn set(&self, snapshot: RawSnapshot) {
        *self.answer.lock() = Ok(snapshot);
    }

    /// Fail with `error` from now on.
    pub fn fail(&self, error: CollectionError) {
        *self.answer.lock() = Err(error);
    }

    /// Number of `fetch()` calls so far.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Collector for ScriptedCollector {
    fn fetch(&self) -> CollectFuture<'_> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.answer.lock().clone()
        })
    }

    fn name(&self) -> &str {
        "scripted"
    }
}
