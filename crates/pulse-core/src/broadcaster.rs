//! Non-blocking fan-out of change notifications.
//!
//! Every attached session owns a small bounded buffer. [`Broadcaster::publish`]
//! tries to push into each buffer and drops the notification for any session
//! whose buffer is full, so a slow consumer only delays its own refresh.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::debug;

/// Default per-session buffer capacity.
pub const DEFAULT_SESSION_BUFFER: usize = 16;

/// A content-free "the store changed" signal.
///
/// The generation is informational only; receivers re-read the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Notification {
    /// Store generation that triggered the publish.
    pub generation: u64,
}

/// Identifier of an attached session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct SessionId(u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

/// Outcome of one [`Broadcaster::publish`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PublishReport {
    /// Sessions the notification was queued for.
    pub delivered: usize,
    /// Sessions whose buffer was full.
    pub dropped: usize,
    /// Sessions found closed and removed.
    pub closed: usize,
}

#[derive(Debug)]
struct Inner {
    sessions: Mutex<HashMap<SessionId, mpsc::Sender<Notification>>>,
    next_id: AtomicU64,
    buffer: usize,
    published: AtomicU64,
    dropped: AtomicU64,
}

impl Inner {
    fn remove(&self, id: SessionId) -> bool {
        self.sessions.lock().remove(&id).is_some()
    }
}

/// Fans notifications out to every attached [`Subscription`].
///
/// Cloning yields another handle to the same set of sessions.
#[derive(Debug, Clone)]
pub struct Broadcaster {
    inner: Arc<Inner>,
}

impl Default for Broadcaster {
    fn default() -> Self {
        Self::new(DEFAULT_SESSION_BUFFER)
    }
}

impl Broadcaster {
    /// Create a broadcaster whose sessions each buffer up to `buffer`
    /// notifications (at least one).
    #[must_use]
    pub fn new(buffer: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                sessions: Mutex::new(HashMap::new()),
                next_id: AtomicU64::new(1),
                buffer: buffer.max(1),
                published: AtomicU64::new(0),
                dropped: AtomicU64::new(0),
            }),
        }
    }

    /// Attach a new session.
    ///
    /// The session is detached when the returned subscription is dropped.
    #[must_use]
    pub fn attach(&self) -> Subscription {
        let id = SessionId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = mpsc::channel(self.inner.buffer);
        self.inner.sessions.lock().insert(id, tx);
        debug!(session = %id, "session attached");
        Subscription {
            id,
            rx,
            owner: Arc::downgrade(&self.inner),
        }
    }

    /// Detach a session. Returns `false` if it was not attached.
    pub fn detach(&self, id: SessionId) -> bool {
        let removed = self.inner.remove(id);
        if removed {
            debug!(session = %id, "session detached");
        }
        removed
    }

    /// Queue `notification` for every attached session without waiting.
    pub fn publish(&self, notification: Notification) -> PublishReport {
        let mut report = PublishReport::default();
        let mut sessions = self.inner.sessions.lock();

        sessions.retain(|id, tx| match tx.try_send(notification) {
            Ok(()) => {
                report.delivered += 1;
                true
            }
            Err(TrySendError::Full(_)) => {
                debug!(session = %id, generation = notification.generation, "session buffer full, notification dropped");
                report.dropped += 1;
                true
            }
            Err(TrySendError::Closed(_)) => {
                report.closed += 1;
                false
            }
        });
        drop(sessions);

        self.inner.published.fetch_add(1, Ordering::Relaxed);
        self.inner
            .dropped
            .fetch_add(report.dropped as u64, Ordering::Relaxed);
        report
    }

    /// Number of attached sessions.
    #[must_use]
    pub fn session_count(&self) -> usize {
        self.inner.sessions.lock().len()
    }

    /// Total `publish` calls.
    #[must_use]
    pub fn published_total(&self) -> u64 {
        self.inner.published.load(Ordering::Relaxed)
    }

    /// Total per-session drops across all publishes.
    #[must_use]
    pub fn dropped_total(&self) -> u64 {
        self.inner.dropped.load(Ordering::Relaxed)
    }
}

/// Receiving end of one attached session.
#[derive(Debug)]
pub struct Subscription {
    id: SessionId,
    rx: mpsc::Receiver<Notification>,
    owner: Weak<Inner>,
}

impl Subscription {
    /// This session's identifier.
    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Wait for the next notification.
    ///
    /// Returns `None` once the session has been detached or every
    /// broadcaster handle is gone.
    pub async fn recv(&mut self) -> Option<Notification> {
        self.rx.recv().await
    }

    /// Discard notifications already queued, returning how many there were.
    pub fn drain(&mut self) -> usize {
        let mut drained = 0;
        while self.rx.try_recv().is_ok() {
            drained += 1;
        }
        drained
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(inner) = self.owner.upgrade() {
            inner.remove(self.id);
        }
    }
}
