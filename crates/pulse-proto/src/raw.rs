//! Raw cluster facts as returned by a collector.

use serde::{Deserialize, Serialize};

/// A node as reported by the cluster API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawNode {
    /// Node name.
    pub name: String,
    /// Whether the node reported a `Ready` condition of `True`.
    #[serde(default)]
    pub ready: bool,
}

impl RawNode {
    /// Create a raw record for a ready node.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ready: true,
        }
    }

    /// Set whether the node is ready.
    #[must_use]
    pub fn with_ready(mut self, ready: bool) -> Self {
        self.ready = ready;
        self
    }
}

/// A workload as reported by the cluster API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawWorkload {
    /// Workload name.
    pub name: String,
    /// Namespace the workload lives in.
    pub namespace: String,
    /// Phase string exactly as the API reported it.
    pub phase: String,
    /// Node the workload is bound to, if any.
    pub node_name: Option<String>,
}

impl RawWorkload {
    /// Create an unscheduled raw workload record.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        namespace: impl Into<String>,
        phase: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            phase: phase.into(),
            node_name: None,
        }
    }

    /// Bind the workload to a node.
    #[must_use]
    pub fn on_node(mut self, node: impl Into<String>) -> Self {
        self.node_name = Some(node.into());
        self
    }
}

/// Everything one `fetch()` returned.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawSnapshot {
    /// Raw nodes, in whatever order the API returned them.
    pub nodes: Vec<RawNode>,
    /// Raw workloads, in whatever order the API returned them.
    pub workloads: Vec<RawWorkload>,
}

impl RawSnapshot {
    /// Create a raw snapshot from its parts.
    #[must_use]
    pub fn new(nodes: Vec<RawNode>, workloads: Vec<RawWorkload>) -> Self {
        Self { nodes, workloads }
    }

    /// Add a ready node.
    #[must_use]
    pub fn with_node(mut self, name: impl Into<String>) -> Self {
        self.nodes.push(RawNode::new(name));
        self
    }

    /// Add a node that is not ready.
    #[must_use]
    pub fn with_unready_node(mut self, name: impl Into<String>) -> Self {
        self.nodes.push(RawNode::new(name).with_ready(false));
        self
    }

    /// Add a workload.
    #[must_use]
    pub fn with_workload(mut self, workload: RawWorkload) -> Self {
        self.workloads.push(workload);
        self
    }
}
