//! Shared state for the dashboard server.

use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::task::{Context, Poll};
use std::time::Instant;

use futures::stream::BoxStream;
use futures::{Stream, StreamExt};
use pulse_core::{Pipeline, StateStore, StreamSession};
use pulse_proto::ClusterState;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::config::DashboardConfig;
use crate::error::{DashboardError, DashboardResult};

/// Shared state for the dashboard server.
#[derive(Debug)]
pub struct DashboardState {
    /// Dashboard configuration.
    config: Arc<DashboardConfig>,
    /// Producer side: store, broadcaster and counters.
    pipeline: Pipeline,
    /// Process-wide shutdown signal handed to every session.
    shutdown: CancellationToken,
    /// Number of open event streams.
    streams: AtomicUsize,
    /// Server start time.
    start_time: Instant,
}

impl DashboardState {
    /// Create a new dashboard state.
    pub fn new(config: DashboardConfig, pipeline: Pipeline, shutdown: CancellationToken) -> Self {
        Self {
            config: Arc::new(config),
            pipeline,
            shutdown,
            streams: AtomicUsize::new(0),
            start_time: Instant::now(),
        }
    }

    /// Get the dashboard configuration.
    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    /// Get the pipeline feeding this dashboard.
    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Get the shutdown token.
    pub fn shutdown(&self) -> &CancellationToken {
        &self.shutdown
    }

    /// Get the state store.
    pub fn store(&self) -> Arc<StateStore> {
        self.pipeline.store()
    }

    /// The current cluster state.
    ///
    /// # Errors
    ///
    /// Returns [`DashboardError::NotReady`] before the first collection.
    pub fn current(&self) -> DashboardResult<Arc<ClusterState>> {
        self.pipeline.store().snapshot().ok_or(DashboardError::NotReady)
    }

    /// Create a session for a new event stream.
    pub fn open_session(&self) -> StreamSession {
        StreamSession::new(
            self.pipeline.store(),
            self.pipeline.broadcaster(),
            self.shutdown.clone(),
        )
    }

    /// Reserve a slot for a new event stream.
    ///
    /// # Errors
    ///
    /// Returns [`DashboardError::TooManyConnections`] when `max_streams`
    /// streams are already open.
    pub fn acquire_stream(self: &Arc<Self>) -> DashboardResult<StreamGuard> {
        let max = self.config.max_streams;
        let current = self.streams.fetch_add(1, Ordering::Relaxed);
        if current >= max {
            self.streams.fetch_sub(1, Ordering::Relaxed);
            return Err(DashboardError::TooManyConnections(current, max));
        }
        Ok(StreamGuard {
            state: Arc::clone(self),
        })
    }

    /// Number of open event streams.
    pub fn stream_count(&self) -> usize {
        self.streams.load(Ordering::Relaxed)
    }

    /// Get server uptime in seconds.
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

/// Holds an event stream slot; released on drop.
#[derive(Debug)]
pub struct StreamGuard {
    state: Arc<DashboardState>,
}

impl StreamGuard {
    /// Attach this slot to `stream`, releasing it when the stream is dropped.
    pub fn hold<S>(self, stream: S) -> GuardedStream<S::Item>
    where
        S: Stream + Send + 'static,
    {
        GuardedStream {
            inner: stream.boxed(),
            _guard: self,
        }
    }
}

impl Drop for StreamGuard {
    fn drop(&mut self) {
        let remaining = self.state.streams.fetch_sub(1, Ordering::Relaxed) - 1;
        debug!(remaining, "event stream closed");
    }
}

/// An event stream that owns its [`StreamGuard`].
pub struct GuardedStream<T> {
    inner: BoxStream<'static, T>,
    _guard: StreamGuard,
}

impl<T> Stream for GuardedStream<T> {
    type Item = T;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        self.inner.poll_next_unpin(cx)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}
