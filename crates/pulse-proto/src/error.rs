//! Error types for the pulse-proto crate.

use thiserror::Error;

/// Errors raised when raw cluster facts cannot form a valid [`ClusterState`].
///
/// [`ClusterState`]: crate::ClusterState
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    /// A node was reported without a name.
    #[error("node with empty name")]
    EmptyNodeName,

    /// A workload was reported without a name.
    #[error("workload with empty name in namespace {namespace:?}")]
    EmptyWorkloadName {
        /// Namespace of the offending workload.
        namespace: String,
    },

    /// The same node name was reported more than once.
    #[error("duplicate node: {0}")]
    DuplicateNode(String),

    /// The same workload identity appears twice under one node.
    #[error("duplicate workload {namespace}/{name} on node {node}")]
    DuplicateWorkload {
        /// Node the duplicates were placed on.
        node: String,
        /// Workload namespace.
        namespace: String,
        /// Workload name.
        name: String,
    },

    /// A workload was placed under a node it is not bound to.
    #[error("workload {namespace}/{name} is bound to {bound:?}, not node {node}")]
    MisboundWorkload {
        /// Node the workload was placed under.
        node: String,
        /// Workload namespace.
        namespace: String,
        /// Workload name.
        name: String,
        /// The workload's own node binding.
        bound: Option<String>,
    },
}

/// A workload phase string that is not one of the known phases.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown workload phase: {0}")]
pub struct ParsePhaseError(pub String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = BuildError::DuplicateNode("n1".to_string());
        assert_eq!(err.to_string(), "duplicate node: n1");

        let err = BuildError::DuplicateWorkload {
            node: "n1".to_string(),
            namespace: "default".to_string(),
            name: "p1".to_string(),
        };
        assert_eq!(err.to_string(), "duplicate workload default/p1 on node n1");
    }
}
