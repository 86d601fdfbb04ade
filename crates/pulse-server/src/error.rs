//! Error types for the server binary.

use pulse_dashboard::DashboardError;
use pulse_kube::KubeError;
use thiserror::Error;

/// Result type alias for server setup and run.
pub type ServerResult<T> = Result<T, ServerError>;

/// Errors that stop the server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// A duration argument could not be parsed.
    #[error("invalid duration {input:?}: {reason}")]
    InvalidDuration {
        /// Text as given.
        input: String,
        /// What is wrong with it.
        reason: String,
    },

    /// A setting is out of range or inconsistent.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The Kubernetes collector could not be created.
    #[error("kubernetes: {0}")]
    Kube(#[from] KubeError),

    /// The HTTP server failed.
    #[error("dashboard: {0}")]
    Dashboard(#[from] DashboardError),

    /// The log subscriber could not be installed.
    #[error("logging setup failed: {0}")]
    Logging(String),
}

impl ServerError {
    pub(crate) fn duration(input: &str, reason: impl Into<String>) -> Self {
        Self::InvalidDuration {
            input: input.to_string(),
            reason: reason.into(),
        }
    }
}
