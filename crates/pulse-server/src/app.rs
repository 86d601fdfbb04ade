//! Task layout for a running server.
//!
//! One producer task drives collection into the pipeline; the HTTP server
//! runs on the caller's task. Both stop when the shutdown token is
//! cancelled, which happens on SIGINT/SIGTERM or when either side fails.

use pulse_core::Pipeline;
use pulse_dashboard::DashboardServer;
use pulse_kube::KubeCollector;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::cli::{Cli, Mode};
use crate::error::ServerResult;

/// Build everything from `cli` and run until shutdown.
///
/// # Errors
///
/// Returns an error if the configuration is invalid, the collector cannot
/// be created, or the HTTP server fails to bind.
pub async fn run(cli: Cli) -> ServerResult<()> {
    cli.validate()?;
    let kube = cli.kube_config()?;
    info!(api_server = %kube.api_server, mode = ?cli.mode, "starting clusterpulse");
    let collector = KubeCollector::new(kube)?;

    let shutdown = CancellationToken::new();
    tokio::spawn(cancel_on_signal(shutdown.clone()));

    let pipeline = Pipeline::new(cli.pipeline_config());
    let server = DashboardServer::new(cli.dashboard_config(), pipeline.clone(), shutdown.clone());
    let producer = spawn_producer(cli.mode, pipeline, collector, shutdown.clone());

    let served = server.serve().await;
    shutdown.cancel();
    if let Err(e) = producer.await {
        warn!(error = %e, "collection task ended abnormally");
    }

    served?;
    info!("clusterpulse stopped");
    Ok(())
}

/// Start the collection loop for `mode`.
pub fn spawn_producer(
    mode: Mode,
    pipeline: Pipeline,
    collector: KubeCollector,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        match mode {
            Mode::Poll => pipeline.run_polling(&collector, shutdown).await,
            Mode::Watch => {
                let (triggers, watches) = collector.watcher().spawn(&shutdown);
                pipeline.run_triggered(&collector, triggers, shutdown.clone()).await;
                // A closed trigger source stops collection; take the watches down too.
                shutdown.cancel();
                for watch in watches {
                    if let Err(e) = watch.await {
                        warn!(error = %e, "watch task ended abnormally");
                    }
                }
            }
        }
    })
}

/// Cancel `shutdown` on SIGINT or SIGTERM.
pub async fn cancel_on_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("received SIGINT, shutting down"),
        () = terminate => info!("received SIGTERM, shutting down"),
        () = shutdown.cancelled() => return,
    }
    shutdown.cancel();
}
