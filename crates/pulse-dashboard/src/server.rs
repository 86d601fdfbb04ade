//! Dashboard server implementation.

use std::sync::Arc;

use pulse_core::Pipeline;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::DashboardConfig;
use crate::error::{DashboardError, DashboardResult};
use crate::routes::create_router;
use crate::state::DashboardState;

/// HTTP server exposing the cached cluster state.
///
/// Shuts down gracefully when the shutdown token is cancelled; open event
/// streams end at the same time since their sessions watch the same token.
#[derive(Debug, Clone)]
pub struct DashboardServer {
    state: Arc<DashboardState>,
}

impl DashboardServer {
    /// Create a new dashboard server reading from `pipeline`.
    #[must_use]
    pub fn new(config: DashboardConfig, pipeline: Pipeline, shutdown: CancellationToken) -> Self {
        let state = Arc::new(DashboardState::new(config, pipeline, shutdown));
        Self { state }
    }

    /// Get the dashboard state for external access.
    #[must_use]
    pub fn state(&self) -> Arc<DashboardState> {
        self.state.clone()
    }

    /// Bind the configured address and serve until shutdown.
    ///
    /// # Errors
    ///
    /// Returns an error if binding to the address fails.
    pub async fn serve(&self) -> DashboardResult<()> {
        let addr = self.state.config().bind_addr;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| DashboardError::BindFailed(addr, e))?;

        self.serve_on(listener).await
    }

    /// Serve on an already bound listener until shutdown.
    ///
    /// # Errors
    ///
    /// Returns an error if the server fails.
    pub async fn serve_on(&self, listener: TcpListener) -> DashboardResult<()> {
        let addr = listener
            .local_addr()
            .map_err(|e| DashboardError::Internal(e.to_string()))?;
        info!(addr = %addr, "Dashboard server listening");

        let shutdown = self.state.shutdown().clone();
        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown.cancelled_owned())
            .await
            .map_err(|e| DashboardError::Internal(e.to_string()))?;

        info!("Dashboard server shut down");
        Ok(())
    }

    /// Create the router without starting the server.
    ///
    /// Useful for testing or embedding in another server.
    pub fn router(&self) -> axum::Router {
        create_router(self.state.clone())
    }
}
