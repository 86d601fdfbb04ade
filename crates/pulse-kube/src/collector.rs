//! [`Collector`] implementation backed by the Kubernetes API.

use pulse_core::{CollectFuture, Collector, CollectionError};
use pulse_proto::RawSnapshot;
use tracing::debug;

use crate::client::KubeClient;
use crate::config::KubeConfig;
use crate::error::KubeResult;
use crate::watch::KubeWatcher;

/// Lists nodes and pods on every fetch.
#[derive(Debug, Clone)]
pub struct KubeCollector {
    client: KubeClient,
    watch_retry_delay: std::time::Duration,
}

impl KubeCollector {
    /// Create a collector for the cluster described by `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: KubeConfig) -> KubeResult<Self> {
        Ok(Self {
            client: KubeClient::new(&config)?,
            watch_retry_delay: config.watch_retry_delay,
        })
    }

    /// A watcher sharing this collector's client.
    pub fn watcher(&self) -> KubeWatcher {
        KubeWatcher::new(self.client.clone(), self.watch_retry_delay)
    }
}

impl Collector for KubeCollector {
    fn fetch(&self) -> CollectFuture<'_> {
        Box::pin(async move {
            let (nodes, workloads) =
                tokio::try_join!(self.client.list_nodes(), self.client.list_pods())
                    .map_err(CollectionError::from)?;
            debug!(nodes = nodes.len(), workloads = workloads.len(), "listed cluster objects");
            Ok(RawSnapshot { nodes, workloads })
        })
    }

    fn name(&self) -> &str {
        "kubernetes"
    }
}
