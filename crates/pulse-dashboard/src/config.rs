//! Dashboard server configuration.

use std::net::SocketAddr;
use std::time::Duration;

/// Configuration for the dashboard server.
#[derive(Debug, Clone)]
pub struct DashboardConfig {
    /// Address to bind the HTTP server to.
    pub bind_addr: SocketAddr,
    /// Maximum concurrent event streams.
    pub max_streams: usize,
    /// Interval between keep-alive comments on idle event streams.
    pub keep_alive: Duration,
    /// CORS allowed origins (empty means all).
    pub cors_origins: Vec<String>,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            max_streams: 1000,
            keep_alive: Duration::from_secs(15),
            cors_origins: Vec::new(),
        }
    }
}

impl DashboardConfig {
    /// Create a new configuration with the specified bind address.
    #[must_use]
    pub fn new(bind_addr: SocketAddr) -> Self {
        Self {
            bind_addr,
            ..Self::default()
        }
    }

    /// Set the maximum number of concurrent event streams.
    #[must_use]
    pub const fn with_max_streams(mut self, max: usize) -> Self {
        self.max_streams = max;
        self
    }

    /// Set the keep-alive interval.
    #[must_use]
    pub const fn with_keep_alive(mut self, interval: Duration) -> Self {
        self.keep_alive = interval;
        self
    }

    /// Add a CORS allowed origin.
    #[must_use]
    pub fn with_cors_origin(mut self, origin: impl Into<String>) -> Self {
        self.cors_origins.push(origin.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};

    #[test]
    fn test_default_config() {
        let config = DashboardConfig::default();

        assert_eq!(config.bind_addr.port(), 8080);
        assert_eq!(config.max_streams, 1000);
        assert_eq!(config.keep_alive, Duration::from_secs(15));
        assert!(config.cors_origins.is_empty());
    }

    #[test]
    fn test_config_builder() {
        let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 9000);
        let config = DashboardConfig::new(addr)
            .with_max_streams(2)
            .with_keep_alive(Duration::from_secs(30))
            .with_cors_origin("http://localhost:3000");

        assert_eq!(config.bind_addr, addr);
        assert_eq!(config.max_streams, 2);
        assert_eq!(config.keep_alive, Duration::from_secs(30));
        assert_eq!(config.cors_origins, ["http://localhost:3000"]);
    }
}
