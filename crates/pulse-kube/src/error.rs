//! Error types for the Kubernetes collector.

use pulse_core::CollectionError;
use thiserror::Error;

/// Result type alias for Kubernetes operations.
pub type KubeResult<T> = Result<T, KubeError>;

/// Errors talking to the Kubernetes API.
#[derive(Debug, Error)]
pub enum KubeError {
    /// The client could not be configured.
    #[error("configuration error: {0}")]
    Config(String),

    /// A credential or certificate file could not be read.
    #[error("failed to read {path}: {source}")]
    ReadFile {
        /// Path that failed.
        path: String,
        /// Underlying error.
        source: std::io::Error,
    },

    /// Transport-level failure.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with a non-success status.
    #[error("{resource} request returned {status}: {body}")]
    Status {
        /// Resource requested.
        resource: &'static str,
        /// HTTP status code.
        status: u16,
        /// Response body (truncated).
        body: String,
    },

    /// A response could not be decoded.
    #[error("failed to decode {resource}: {source}")]
    Decode {
        /// Resource being decoded.
        resource: &'static str,
        /// Decoder error.
        source: serde_json::Error,
    },

    /// A watch stream broke or reported an error event.
    #[error("watch on {resource} failed: {message}")]
    Watch {
        /// Resource being watched.
        resource: &'static str,
        /// What went wrong.
        message: String,
    },
}

impl From<KubeError> for CollectionError {
    fn from(err: KubeError) -> Self {
        match err {
            KubeError::Status { status, body, .. } => Self::Api {
                status,
                message: body,
            },
            KubeError::Decode { resource, source } => Self::Decode {
                resource: resource.to_string(),
                message: source.to_string(),
            },
            other => Self::Transport(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_maps_to_api_error() {
        let err = KubeError::Status {
            resource: "pods",
            status: 403,
            body: "forbidden".to_string(),
        };
        assert_eq!(err.to_string(), "pods request returned 403: forbidden");

        let converted = CollectionError::from(err);
        assert!(matches!(converted, CollectionError::Api { status: 403, .. }));
    }

    #[test]
    fn test_decode_maps_to_decode_error() {
        let source = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let converted = CollectionError::from(KubeError::Decode {
            resource: "nodes",
            source,
        });
        assert!(matches!(converted, CollectionError::Decode { ref resource, .. } if resource == "nodes"));
    }

    #[test]
    fn test_other_errors_are_transport() {
        let converted = CollectionError::from(KubeError::Config("no host".to_string()));
        assert!(matches!(converted, CollectionError::Transport(_)));
    }
}
