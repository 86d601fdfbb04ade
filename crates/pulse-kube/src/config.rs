//! Connection settings for the Kubernetes API.

use std::path::Path;
use std::time::Duration;

use url::Url;

use crate::error::{KubeError, KubeResult};

/// Default service-account token location inside a pod.
pub const SERVICE_ACCOUNT_TOKEN: &str = "/var/run/secrets/kubernetes.io/serviceaccount/token";

/// Default service-account CA bundle location inside a pod.
pub const SERVICE_ACCOUNT_CA: &str = "/var/run/secrets/kubernetes.io/serviceaccount/ca.crt";

/// How to reach and authenticate to the Kubernetes API server.
#[derive(Clone)]
pub struct KubeConfig {
    /// Base URL of the API server.
    pub api_server: Url,
    /// Bearer token, if any.
    pub token: Option<String>,
    /// PEM bundle trusted in addition to the system roots.
    pub ca_pem: Option<Vec<u8>>,
    /// Skip TLS certificate verification.
    pub insecure_skip_tls_verify: bool,
    /// Timeout for list requests (watch streams are not limited).
    pub request_timeout: Duration,
    /// Delay before re-opening a broken watch stream.
    pub watch_retry_delay: Duration,
}

impl std::fmt::Debug for KubeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeConfig")
            .field("api_server", &self.api_server.as_str())
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("ca_pem", &self.ca_pem.as_ref().map(Vec::len))
            .field("insecure_skip_tls_verify", &self.insecure_skip_tls_verify)
            .field("request_timeout", &self.request_timeout)
            .field("watch_retry_delay", &self.watch_retry_delay)
            .finish()
    }
}

impl KubeConfig {
    /// Create a configuration for `api_server` without credentials.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid.
    pub fn new(api_server: &str) -> KubeResult<Self> {
        let api_server = Url::parse(api_server)
            .map_err(|e| KubeError::Config(format!("invalid API server URL {api_server:?}: {e}")))?;
        Ok(Self {
            api_server,
            token: None,
            ca_pem: None,
            insecure_skip_tls_verify: false,
            request_timeout: Duration::from_secs(10),
            watch_retry_delay: Duration::from_secs(5),
        })
    }

    /// Configuration for a process running inside a pod.
    ///
    /// Reads `KUBERNETES_SERVICE_HOST`/`KUBERNETES_SERVICE_PORT` and the
    /// mounted service-account token and CA bundle.
    ///
    /// # Errors
    ///
    /// Returns an error if the environment variables are missing or the
    /// service-account files cannot be read.
    pub fn in_cluster() -> KubeResult<Self> {
        let host = std::env::var("KUBERNETES_SERVICE_HOST")
            .map_err(|_| KubeError::Config("KUBERNETES_SERVICE_HOST is not set".to_string()))?;
        let port = std::env::var("KUBERNETES_SERVICE_PORT")
            .map_err(|_| KubeError::Config("KUBERNETES_SERVICE_PORT is not set".to_string()))?;

        Self::from_service_account(
            &host,
            &port,
            Path::new(SERVICE_ACCOUNT_TOKEN),
            Path::new(SERVICE_ACCOUNT_CA),
        )
    }

    /// Build an in-cluster style configuration from explicit parts.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is invalid or a file cannot be read.
    pub fn from_service_account(
        host: &str,
        port: &str,
        token_path: &Path,
        ca_path: &Path,
    ) -> KubeResult<Self> {
        let host = if host.contains(':') && !host.starts_with('[') {
            format!("[{host}]")
        } else {
            host.to_string()
        };

        Self::new(&format!("https://{host}:{port}"))?
            .with_token_file(token_path)?
            .with_ca_file(ca_path)
    }

    /// Use a bearer token.
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Read the bearer token from a file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is empty.
    pub fn with_token_file(self, path: &Path) -> KubeResult<Self> {
        let token = read_file(path)?;
        let token = String::from_utf8_lossy(&token).trim().to_string();
        if token.is_empty() {
            return Err(KubeError::Config(format!(
                "token file {} is empty",
                path.display()
            )));
        }
        Ok(self.with_token(token))
    }

    /// Trust the PEM bundle in `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read.
    pub fn with_ca_file(mut self, path: &Path) -> KubeResult<Self> {
        self.ca_pem = Some(read_file(path)?);
        Ok(self)
    }

    /// Skip TLS verification.
    #[must_use]
    pub const fn with_insecure_skip_tls_verify(mut self, skip: bool) -> Self {
        self.insecure_skip_tls_verify = skip;
        self
    }

    /// Set the list request timeout.
    #[must_use]
    pub const fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set the watch reconnect delay.
    #[must_use]
    pub const fn with_watch_retry_delay(mut self, delay: Duration) -> Self {
        self.watch_retry_delay = delay;
        self
    }
}

fn read_file(path: &Path) -> KubeResult<Vec<u8>> {
    std::fs::read(path).map_err(|source| KubeError::ReadFile {
        path: path.display().to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(dir: &tempfile::TempDir, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_new_defaults() {
        let config = KubeConfig::new("https://10.0.0.1:6443").unwrap();

        assert_eq!(config.api_server.as_str(), "https://10.0.0.1:6443/");
        assert!(config.token.is_none());
        assert!(!config.insecure_skip_tls_verify);
        assert_eq!(config.request_timeout, Duration::from_secs(10));
        assert_eq!(config.watch_retry_delay, Duration::from_secs(5));
    }

    #[test]
    fn test_invalid_url() {
        let err = KubeConfig::new("not a url").unwrap_err();
        assert!(matches!(err, KubeError::Config(_)));
    }

    #[test]
    fn test_from_service_account() {
        let dir = tempfile::tempdir().unwrap();
        let token = write_temp(&dir, "token", "abc.def\n");
        let ca = write_temp(&dir, "ca.crt", "-----BEGIN CERTIFICATE-----\n");

        let config = KubeConfig::from_service_account("10.96.0.1", "443", &token, &ca).unwrap();

        assert_eq!(config.api_server.as_str(), "https://10.96.0.1/");
        assert_eq!(config.token.as_deref(), Some("abc.def"));
        assert!(config.ca_pem.is_some());
    }

    #[test]
    fn test_from_service_account_ipv6_host() {
        let dir = tempfile::tempdir().unwrap();
        let token = write_temp(&dir, "token", "t");
        let ca = write_temp(&dir, "ca.crt", "ca");

        let config = KubeConfig::from_service_account("fd00::1", "6443", &token, &ca).unwrap();

        assert_eq!(config.api_server.host_str(), Some("[fd00::1]"));
        assert_eq!(config.api_server.port(), Some(6443));
    }

    #[test]
    fn test_missing_token_file() {
        let dir = tempfile::tempdir().unwrap();
        let ca = write_temp(&dir, "ca.crt", "ca");

        let err = KubeConfig::from_service_account("10.96.0.1", "443", &dir.path().join("nope"), &ca)
            .unwrap_err();
        assert!(matches!(err, KubeError::ReadFile { .. }));
    }

    #[test]
    fn test_empty_token_file() {
        let dir = tempfile::tempdir().unwrap();
        let token = write_temp(&dir, "token", "  \n");

        let err = KubeConfig::new("https://k8s:6443")
            .unwrap()
            .with_token_file(&token)
            .unwrap_err();
        assert!(matches!(err, KubeError::Config(_)));
    }

    #[test]
    fn test_debug_redacts_token() {
        let config = KubeConfig::new("https://k8s:6443").unwrap().with_token("secret");
        let debug = format!("{config:?}");

        assert!(!debug.contains("secret"));
        assert!(debug.contains("<redacted>"));
    }
}
