//! Error types for the collection pipeline.

use std::time::Duration;

use pulse_proto::BuildError;
use thiserror::Error;

/// Result type alias for collector operations.
pub type CollectionResult<T> = Result<T, CollectionError>;

/// A collection cycle could not produce a usable snapshot.
///
/// Every variant is treated the same way by the pipeline: the cycle is
/// skipped and the cached state is left alone.
#[derive(Debug, Clone, Error)]
pub enum CollectionError {
    /// Network-level failure talking to the cluster API.
    #[error("transport error: {0}")]
    Transport(String),

    /// The cluster API answered with a non-success status.
    #[error("cluster API returned {status}: {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body or reason.
        message: String,
    },

    /// A response body could not be decoded.
    #[error("failed to decode {resource}: {message}")]
    Decode {
        /// Which resource list was being decoded.
        resource: String,
        /// Decoder message.
        message: String,
    },

    /// The fetch did not complete in time.
    #[error("fetch timed out after {0:?}")]
    Timeout(Duration),

    /// The raw data could not form a valid cluster state.
    #[error("malformed cluster data: {0}")]
    Malformed(#[from] BuildError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CollectionError::Api {
            status: 403,
            message: "forbidden".to_string(),
        };
        assert_eq!(err.to_string(), "cluster API returned 403: forbidden");

        let err = CollectionError::Timeout(Duration::from_secs(10));
        assert_eq!(err.to_string(), "fetch timed out after 10s");
    }

    #[test]
    fn test_from_build_error() {
        let err = CollectionError::from(BuildError::DuplicateNode("n1".to_string()));
        assert!(matches!(err, CollectionError::Malformed(_)));
        assert!(err.to_string().contains("duplicate node: n1"));
    }
}
