//! Log subscriber setup.

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::cli::LogFormat;
use crate::error::{ServerError, ServerResult};

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str =
    "warn,clusterpulse=info,pulse_core=info,pulse_kube=info,pulse_dashboard=info,pulse_server=info,tower_http=info";

/// Build the level filter from `RUST_LOG`, falling back to [`DEFAULT_FILTER`].
///
/// # Errors
///
/// Returns an error if the fallback directives do not parse.
pub fn env_filter() -> ServerResult<EnvFilter> {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(DEFAULT_FILTER))
        .map_err(|e| ServerError::Logging(e.to_string()))
}

/// Install the global subscriber.
///
/// # Errors
///
/// Returns an error if a subscriber is already installed.
pub fn init(format: LogFormat) -> ServerResult<()> {
    let registry = tracing_subscriber::registry().with(env_filter()?);
    let installed = match format {
        LogFormat::Text => registry.with(fmt::layer()).try_init(),
        LogFormat::Json => registry.with(fmt::layer().json()).try_init(),
    };
    installed.map_err(|e| ServerError::Logging(e.to_string()))
}
