//! Per-consumer stream life cycle.
//!
//! A session moves through `Attaching -> Streaming -> Closed`. The first
//! frame is always a baseline read straight from the store; the session
//! attaches to the broadcaster only after that frame has been handed out,
//! and from then on every notification triggers a fresh read of the store.

use std::sync::Arc;

use futures::Stream;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::broadcaster::{Broadcaster, Subscription};
use crate::store::{StateStore, StoreSnapshot};

/// Where a session is in its life cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Created; the baseline has not been delivered.
    Attaching,
    /// Baseline delivered; forwarding changes.
    Streaming,
    /// Finished; no further frames.
    Closed,
}

/// Why a session closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// The process is shutting down.
    Shutdown,
    /// The consumer went away.
    Disconnected,
    /// The session was detached from the broadcaster.
    Detached,
}

enum Wake {
    Notified,
    Shutdown,
    Detached,
}

/// One attached consumer of cluster state.
#[derive(Debug)]
pub struct StreamSession {
    store: Arc<StateStore>,
    broadcaster: Broadcaster,
    shutdown: CancellationToken,
    state: SessionState,
    subscription: Option<Subscription>,
    delivered: Option<u64>,
    close_reason: Option<CloseReason>,
}

impl StreamSession {
    /// Create a session in the `Attaching` state.
    #[must_use]
    pub fn new(
        store: Arc<StateStore>,
        broadcaster: Broadcaster,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            store,
            broadcaster,
            shutdown,
            state: SessionState::Attaching,
            subscription: None,
            delivered: None,
            close_reason: None,
        }
    }

    /// Current life-cycle state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Why the session closed, once it has.
    #[must_use]
    pub fn close_reason(&self) -> Option<CloseReason> {
        self.close_reason
    }

    /// Wait for the next frame to deliver.
    ///
    /// The first call returns the baseline snapshot immediately. Later calls
    /// wait for a change notification and return the store's state at that
    /// moment. Returns `None` once the session is closed.
    pub async fn next_frame(&mut self) -> Option<StoreSnapshot> {
        match self.state {
            SessionState::Closed => None,
            SessionState::Attaching => {
                if self.shutdown.is_cancelled() {
                    self.close(CloseReason::Shutdown);
                    return None;
                }
                let baseline = self.store.versioned();
                self.delivered = Some(baseline.generation);
                self.state = SessionState::Streaming;
                Some(baseline)
            }
            SessionState::Streaming => self.next_change().await,
        }
    }

    async fn next_change(&mut self) -> Option<StoreSnapshot> {
        if self.subscription.is_none() {
            self.subscription = Some(self.broadcaster.attach());
            // An install between the baseline read and the attach published
            // before we were listening.
            if let Some(frame) = self.fresh_frame() {
                return Some(frame);
            }
        }

        loop {
            let wake = {
                let Some(subscription) = self.subscription.as_mut() else {
                    return None;
                };
                tokio::select! {
                    biased;
                    () = self.shutdown.cancelled() => Wake::Shutdown,
                    notification = subscription.recv() => match notification {
                        Some(_) => Wake::Notified,
                        None => Wake::Detached,
                    },
                }
            };

            match wake {
                Wake::Shutdown => {
                    self.close(CloseReason::Shutdown);
                    return None;
                }
                Wake::Detached => {
                    self.close(CloseReason::Detached);
                    return None;
                }
                Wake::Notified => {
                    if let Some(subscription) = self.subscription.as_mut() {
                        subscription.drain();
                    }
                    if let Some(frame) = self.fresh_frame() {
                        return Some(frame);
                    }
                }
            }
        }
    }

    /// Read the store, returning the frame only if it is newer than the
    /// last one delivered.
    fn fresh_frame(&mut self) -> Option<StoreSnapshot> {
        let current = self.store.versioned();
        if self.delivered == Some(current.generation) {
            return None;
        }
        self.delivered = Some(current.generation);
        Some(current)
    }

    /// Close the session because the consumer went away.
    pub fn disconnect(&mut self) {
        self.close(CloseReason::Disconnected);
    }

    fn close(&mut self, reason: CloseReason) {
        if self.state == SessionState::Closed {
            return;
        }
        self.state = SessionState::Closed;
        self.close_reason = Some(reason);
        if let Some(subscription) = self.subscription.take() {
            self.broadcaster.detach(subscription.id());
        }
        debug!(reason = ?reason, "stream session closed");
    }

    /// Turn the session into a stream of frames that ends when it closes.
    ///
    /// Dropping the stream detaches the session.
    pub fn into_stream(self) -> impl Stream<Item = StoreSnapshot> + Send {
        futures::stream::unfold(self, |mut session| async move {
            let frame = session.next_frame().await?;
            Some((frame, session))
        })
    }
}
