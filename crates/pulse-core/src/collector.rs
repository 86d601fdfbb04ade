//! The collector contract.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use pulse_proto::RawSnapshot;

use crate::error::CollectionResult;

/// Boxed future returned by [`Collector::fetch`].
pub type CollectFuture<'a> = Pin<Box<dyn Future<Output = CollectionResult<RawSnapshot>> + Send + 'a>>;

/// Source of raw cluster facts.
///
/// Implementations must tolerate being called repeatedly, including after a
/// failed call. How the facts are obtained (list calls, a cached watch, a
/// fixture) is entirely up to the implementation.
pub trait Collector: Send + Sync {
    /// Fetch the current nodes and workloads.
    ///
    /// # Errors
    ///
    /// Returns an error if the facts could not be obtained this time.
    fn fetch(&self) -> CollectFuture<'_>;

    /// Short name used in logs.
    fn name(&self) -> &str {
        "collector"
    }
}

impl<C: Collector + ?Sized> Collector for Arc<C> {
    fn fetch(&self) -> CollectFuture<'_> {
        (**self).fetch()
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

impl<C: Collector + ?Sized> Collector for Box<C> {
    fn fetch(&self) -> CollectFuture<'_> {
        (**self).fetch()
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
