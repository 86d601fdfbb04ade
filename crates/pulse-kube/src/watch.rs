//! Watch-driven change triggers.
//!
//! A [`KubeWatcher`] keeps one watch open per [`Resource`]. Every change
//! event becomes a `()` trigger; the content of the event is ignored and
//! the pipeline re-lists everything when it runs. Broken streams are
//! re-opened after a fixed delay.

use std::time::Duration;

use futures::StreamExt;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::client::KubeClient;
use crate::resources::Resource;

/// Capacity of the trigger channel. One pending trigger is enough since
/// triggers carry no content.
pub const TRIGGER_CAPACITY: usize = 1;

/// Follows node and pod watches and emits collection triggers.
#[derive(Debug, Clone)]
pub struct KubeWatcher {
    client: KubeClient,
    retry_delay: Duration,
}

/// Why a single watch connection ended.
enum WatchEnd {
    /// Cancelled; do not reconnect.
    Shutdown,
    /// The trigger receiver is gone; do not reconnect.
    Orphaned,
    /// The stream ended or failed; reconnect.
    Broken,
}

impl KubeWatcher {
    /// Create a watcher that reconnects after `retry_delay`.
    pub fn new(client: KubeClient, retry_delay: Duration) -> Self {
        Self {
            client,
            retry_delay,
        }
    }

    /// Start one watch task per resource.
    ///
    /// Returns the trigger receiver and the task handles. The tasks stop
    /// when `shutdown` is cancelled or the receiver is dropped.
    pub fn spawn(&self, shutdown: &CancellationToken) -> (mpsc::Receiver<()>, Vec<JoinHandle<()>>) {
        let (tx, rx) = mpsc::channel(TRIGGER_CAPACITY);
        let handles = Resource::ALL
            .into_iter()
            .map(|resource| {
                tokio::spawn(watch_loop(
                    self.client.clone(),
                    resource,
                    tx.clone(),
                    self.retry_delay,
                    shutdown.clone(),
                ))
            })
            .collect();
        (rx, handles)
    }
}

async fn watch_loop(
    client: KubeClient,
    resource: Resource,
    triggers: mpsc::Sender<()>,
    retry_delay: Duration,
    shutdown: CancellationToken,
) {
    info!(%resource, "watch started");
    let mut connected_before = false;

    loop {
        let end = tokio::select! {
            biased;
            () = shutdown.cancelled() => WatchEnd::Shutdown,
            end = watch_once(&client, resource, &triggers, connected_before) => end,
        };

        match end {
            WatchEnd::Shutdown | WatchEnd::Orphaned => break,
            WatchEnd::Broken => {}
        }
        connected_before = true;

        tokio::select! {
            biased;
            () = shutdown.cancelled() => break,
            () = tokio::time::sleep(retry_delay) => {}
        }
    }

    info!(%resource, "watch stopped");
}

async fn watch_once(
    client: &KubeClient,
    resource: Resource,
    triggers: &mpsc::Sender<()>,
    reconnect: bool,
) -> WatchEnd {
    let mut events = match client.watch(resource).await {
        Ok(events) => events,
        Err(e) => {
            warn!(%resource, error = %e, "failed to open watch, retrying");
            return WatchEnd::Broken;
        }
    };

    // Changes may have been missed while the stream was down.
    if reconnect && !fire(triggers) {
        return WatchEnd::Orphaned;
    }

    while let Some(event) = events.next().await {
        match event {
            Ok(event) if event.is_change() => {
                debug!(%resource, kind = %event.kind, "watch event");
                if !fire(triggers) {
                    return WatchEnd::Orphaned;
                }
            }
            Ok(_) => {}
            Err(e) => {
                warn!(%resource, error = %e, "watch failed, retrying");
                return WatchEnd::Broken;
            }
        }
    }

    debug!(%resource, "watch stream closed by server");
    WatchEnd::Broken
}

/// Send a trigger. Returns `false` once the receiver is gone.
fn fire(triggers: &mpsc::Sender<()>) -> bool {
    match triggers.try_send(()) {
        Ok(()) | Err(TrySendError::Full(())) => true,
        Err(TrySendError::Closed(())) => false,
    }
}
