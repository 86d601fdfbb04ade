//! # pulse-dashboard
//!
//! HTTP surface for clusterpulse.
//!
//! Serves the cached cluster state as JSON and as a server-sent events
//! stream. Every stream starts with the current state and then sends the
//! latest state again each time it changes.
//!
//! ## Example
//!
//! ```rust,no_run
//! use pulse_core::{Pipeline, PipelineConfig};
//! use pulse_dashboard::{DashboardConfig, DashboardServer};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn run() -> Result<(), pulse_dashboard::DashboardError> {
//! let pipeline = Pipeline::new(PipelineConfig::default());
//! let server = DashboardServer::new(DashboardConfig::default(), pipeline, CancellationToken::new());
//! server.serve().await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## API Endpoints
//!
//! | Endpoint | Method | Description |
//! |----------|--------|-------------|
//! | `/api/health` | GET | Liveness and uptime |
//! | `/api/status` | GET | Pipeline and stream counters |
//! | `/api/state` | GET | Current cluster state |
//! | `/api/nodes` | GET | Nodes with workload counts |
//! | `/api/pods` | GET | Workloads, filterable by `namespace` and `phase` |
//! | `/api/events` | GET | Cluster state stream (SSE, `updated` events) |

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod server;
pub mod state;

pub use config::DashboardConfig;
pub use error::{DashboardError, DashboardResult};
pub use server::DashboardServer;
pub use state::{DashboardState, StreamGuard};
