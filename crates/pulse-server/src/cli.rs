//! Command line and environment configuration.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use pulse_core::PipelineConfig;
use pulse_dashboard::DashboardConfig;
use pulse_kube::KubeConfig;

use crate::duration::{parse_duration, parse_positive_duration};
use crate::error::{ServerError, ServerResult};

/// How collection is driven.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    /// Re-list on a fixed interval.
    Poll,
    /// Re-list when a watch reports a change.
    Watch,
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines.
    Text,
    /// One JSON object per line.
    Json,
}

/// Live view of Kubernetes nodes and pods over HTTP.
#[derive(Debug, Clone, Parser)]
#[command(name = "clusterpulse")]
#[command(about = "Live view of Kubernetes nodes and pods over HTTP")]
#[command(version)]
pub struct Cli {
    /// Collection interval in poll mode (e.g. 5s, 500ms, 1m).
    #[arg(long, env = "QUERY_INTERVAL", default_value = "5s", value_parser = parse_positive_duration)]
    pub interval: Duration,

    /// Collection mode.
    #[arg(long, env = "CLUSTERPULSE_MODE", value_enum, default_value_t = Mode::Poll)]
    pub mode: Mode,

    /// Address to serve HTTP on.
    #[arg(long, env = "CLUSTERPULSE_BIND", default_value = "0.0.0.0:8080")]
    pub bind: SocketAddr,

    /// Kubernetes API server URL; in-cluster configuration is used when absent.
    #[arg(long, env = "CLUSTERPULSE_API_SERVER")]
    pub api_server: Option<String>,

    /// File holding the bearer token.
    #[arg(long, env = "CLUSTERPULSE_TOKEN_FILE")]
    pub token_file: Option<PathBuf>,

    /// PEM bundle to trust for the API server.
    #[arg(long, env = "CLUSTERPULSE_CA_FILE")]
    pub ca_file: Option<PathBuf>,

    /// Skip API server certificate verification.
    #[arg(long)]
    pub insecure_skip_tls_verify: bool,

    /// Pending notifications kept per stream before dropping.
    #[arg(long, default_value_t = pulse_core::broadcaster::DEFAULT_SESSION_BUFFER)]
    pub session_buffer: usize,

    /// Maximum concurrent event streams.
    #[arg(long, default_value_t = 1000)]
    pub max_streams: usize,

    /// Keep-alive interval on idle event streams.
    #[arg(long, default_value = "15s", value_parser = parse_positive_duration)]
    pub keep_alive: Duration,

    /// Quiet period used to fold bursts of watch events into one collection.
    #[arg(long, default_value = "250ms", value_parser = parse_duration)]
    pub watch_debounce: Duration,

    /// Allowed CORS origin (repeatable; all origins when omitted).
    #[arg(long = "cors-origin")]
    pub cors_origins: Vec<String>,

    /// Log output format.
    #[arg(long, env = "CLUSTERPULSE_LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

impl Cli {
    /// Reject settings clap cannot check on its own.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::InvalidConfig`] on a zero-sized limit.
    pub fn validate(&self) -> ServerResult<()> {
        if self.session_buffer == 0 {
            return Err(ServerError::InvalidConfig(
                "--session-buffer must be at least 1".to_string(),
            ));
        }
        if self.max_streams == 0 {
            return Err(ServerError::InvalidConfig(
                "--max-streams must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Pipeline settings.
    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig::default()
            .with_interval(self.interval)
            .with_debounce(self.watch_debounce)
            .with_session_buffer(self.session_buffer)
    }

    /// HTTP server settings.
    pub fn dashboard_config(&self) -> DashboardConfig {
        self.cors_origins.iter().fold(
            DashboardConfig::new(self.bind)
                .with_max_streams(self.max_streams)
                .with_keep_alive(self.keep_alive),
            |config, origin| config.with_cors_origin(origin),
        )
    }

    /// Kubernetes connection settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-cluster environment is missing or a
    /// credential file cannot be read.
    pub fn kube_config(&self) -> ServerResult<KubeConfig> {
        let mut config = match &self.api_server {
            Some(url) => KubeConfig::new(url)?,
            None => KubeConfig::in_cluster()?,
        };
        if let Some(path) = &self.token_file {
            config = config.with_token_file(path)?;
        }
        if let Some(path) = &self.ca_file {
            config = config.with_ca_file(path)?;
        }
        Ok(config.with_insecure_skip_tls_verify(self.insecure_skip_tls_verify))
    }
}
