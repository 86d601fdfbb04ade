//! Canonical cluster state types.
//!
//! A [`ClusterState`] is built once per collection cycle and never mutated
//! afterwards. Constructors sort nodes by name and workloads by
//! `(namespace, name)`, so two states describing the same cluster compare
//! equal and serialize identically regardless of the order the facts were
//! reported in.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{BuildError, ParsePhaseError};

/// Lifecycle phase of a workload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum WorkloadPhase {
    /// Accepted but not yet running.
    Pending,
    /// Bound to a node with at least one container running.
    Running,
    /// All containers terminated successfully.
    Succeeded,
    /// All containers terminated, at least one in failure.
    Failed,
    /// Phase could not be determined.
    Unknown,
}

impl WorkloadPhase {
    /// Every phase, in declaration order.
    pub const ALL: [Self; 5] = [
        Self::Pending,
        Self::Running,
        Self::Succeeded,
        Self::Failed,
        Self::Unknown,
    ];

    /// Interpret a phase reported by the cluster API.
    ///
    /// Anything unrecognized (including an empty string) is `Unknown`.
    #[must_use]
    pub fn from_raw(s: &str) -> Self {
        s.parse().unwrap_or(Self::Unknown)
    }

    /// The canonical spelling of this phase.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Running => "Running",
            Self::Succeeded => "Succeeded",
            Self::Failed => "Failed",
            Self::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for WorkloadPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkloadPhase {
    type Err = ParsePhaseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|phase| phase.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ParsePhaseError(s.to_string()))
    }
}

/// A workload as it appears in the canonical state.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkloadEntry {
    /// Workload name, unique within its namespace.
    pub name: String,
    /// Namespace the workload lives in.
    pub namespace: String,
    /// Current lifecycle phase.
    pub phase: WorkloadPhase,
    /// Name of the node the workload is bound to, if scheduled.
    pub node: Option<String>,
}

impl WorkloadEntry {
    /// Create an unscheduled workload.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        namespace: impl Into<String>,
        phase: WorkloadPhase,
    ) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            phase,
            node: None,
        }
    }

    /// Bind the workload to a node.
    #[must_use]
    pub fn with_node(mut self, node: impl Into<String>) -> Self {
        self.node = Some(node.into());
        self
    }

    /// Identity of the workload: `(namespace, name)`.
    #[must_use]
    pub fn key(&self) -> (&str, &str) {
        (&self.namespace, &self.name)
    }
}

/// Whether a node can take workloads.
///
/// A node is `Ready` only when the cluster reports its `Ready` condition as
/// `True`. A missing or failing condition is `NotReady`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeStatus {
    /// The node's `Ready` condition is `True`.
    Ready,
    /// Anything else.
    #[default]
    NotReady,
}

impl NodeStatus {
    /// Status from a ready flag.
    #[must_use]
    pub const fn from_ready(ready: bool) -> Self {
        if ready { Self::Ready } else { Self::NotReady }
    }

    /// Check if the node is ready.
    #[must_use]
    pub const fn is_ready(self) -> bool {
        matches!(self, Self::Ready)
    }

    /// The canonical spelling of this status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ready => "Ready",
            Self::NotReady => "NotReady",
        }
    }
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A node and the workloads currently placed on it.
///
/// Workloads are kept sorted by [`WorkloadEntry::key`], and every workload's
/// `node` field names this node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "NodeEntryWire")]
pub struct NodeEntry {
    name: String,
    status: NodeStatus,
    workloads: Vec<WorkloadEntry>,
}

#[derive(Deserialize)]
struct NodeEntryWire {
    name: String,
    #[serde(default)]
    status: NodeStatus,
    #[serde(default)]
    workloads: Vec<WorkloadEntry>,
}

impl TryFrom<NodeEntryWire> for NodeEntry {
    type Error = BuildError;

    fn try_from(wire: NodeEntryWire) -> Result<Self, Self::Error> {
        Ok(Self::new(wire.name, wire.workloads)?.with_status(wire.status))
    }
}

impl NodeEntry {
    /// Create a ready node entry, putting its workloads in canonical order.
    ///
    /// # Errors
    ///
    /// Fails if the node name is empty, a workload has no name, a workload
    /// is bound to a different node, or a workload identity repeats.
    pub fn new(
        name: impl Into<String>,
        mut workloads: Vec<WorkloadEntry>,
    ) -> Result<Self, BuildError> {
        let name = name.into();
        if name.is_empty() {
            return Err(BuildError::EmptyNodeName);
        }

        for workload in &workloads {
            if workload.name.is_empty() {
                return Err(BuildError::EmptyWorkloadName {
                    namespace: workload.namespace.clone(),
                });
            }
            if workload.node.as_deref() != Some(name.as_str()) {
                return Err(BuildError::MisboundWorkload {
                    node: name,
                    namespace: workload.namespace.clone(),
                    name: workload.name.clone(),
                    bound: workload.node.clone(),
                });
            }
        }

        workloads.sort_by(|a, b| a.key().cmp(&b.key()));

        if let Some(pair) = workloads.windows(2).find(|w| w[0].key() == w[1].key()) {
            return Err(BuildError::DuplicateWorkload {
                node: name,
                namespace: pair[0].namespace.clone(),
                name: pair[0].name.clone(),
            });
        }

        Ok(Self {
            name,
            status: NodeStatus::Ready,
            workloads,
        })
    }

    /// Set the node's readiness.
    #[must_use]
    pub fn with_status(mut self, status: NodeStatus) -> Self {
        self.status = status;
        self
    }

    /// Create a ready node entry with no workloads.
    ///
    /// # Errors
    ///
    /// Fails if the name is empty.
    pub fn empty(name: impl Into<String>) -> Result<Self, BuildError> {
        Self::new(name, Vec::new())
    }

    /// Node name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Node readiness.
    #[must_use]
    pub const fn status(&self) -> NodeStatus {
        self.status
    }

    /// Workloads on this node, in canonical order.
    #[must_use]
    pub fn workloads(&self) -> &[WorkloadEntry] {
        &self.workloads
    }

    /// Number of workloads on this node.
    #[must_use]
    pub fn workload_count(&self) -> usize {
        self.workloads.len()
    }
}

/// Snapshot of the whole cluster as of one collection cycle.
///
/// A state with zero nodes is valid; "nothing collected yet" is modelled
/// by the absence of a state, not by an empty one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "ClusterStateWire")]
pub struct ClusterState {
    nodes: Vec<NodeEntry>,
}

#[derive(Deserialize)]
struct ClusterStateWire {
    #[serde(default)]
    nodes: Vec<NodeEntry>,
}

impl TryFrom<ClusterStateWire> for ClusterState {
    type Error = BuildError;

    fn try_from(wire: ClusterStateWire) -> Result<Self, Self::Error> {
        Self::new(wire.nodes)
    }
}

impl ClusterState {
    /// Create a cluster state, putting nodes in canonical order.
    ///
    /// # Errors
    ///
    /// Fails if a node name repeats.
    pub fn new(mut nodes: Vec<NodeEntry>) -> Result<Self, BuildError> {
        nodes.sort_by(|a, b| a.name.cmp(&b.name));

        if let Some(pair) = nodes.windows(2).find(|w| w[0].name == w[1].name) {
            return Err(BuildError::DuplicateNode(pair[0].name.clone()));
        }

        Ok(Self { nodes })
    }

    /// A state with no nodes.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Nodes in canonical order.
    #[must_use]
    pub fn nodes(&self) -> &[NodeEntry] {
        &self.nodes
    }

    /// Look up a node by name.
    #[must_use]
    pub fn node(&self, name: &str) -> Option<&NodeEntry> {
        self.nodes
            .binary_search_by(|n| n.name.as_str().cmp(name))
            .ok()
            .map(|idx| &self.nodes[idx])
    }

    /// Number of nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of workloads across all nodes.
    #[must_use]
    pub fn workload_count(&self) -> usize {
        self.nodes.iter().map(NodeEntry::workload_count).sum()
    }

    /// Iterate over every workload, node by node.
    pub fn workloads(&self) -> impl Iterator<Item = &WorkloadEntry> {
        self.nodes.iter().flat_map(|n| n.workloads.iter())
    }

    /// Check if the cluster has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn pod(name: &str, namespace: &str, node: &str) -> WorkloadEntry {
        WorkloadEntry::new(name, namespace, WorkloadPhase::Running).with_node(node)
    }

    #[test_case("Running", WorkloadPhase::Running ; "exact")]
    #[test_case("pending", WorkloadPhase::Pending ; "lowercase")]
    #[test_case("SUCCEEDED", WorkloadPhase::Succeeded ; "uppercase")]
    #[test_case("Failed", WorkloadPhase::Failed ; "failed")]
    #[test_case("Evicted", WorkloadPhase::Unknown ; "unrecognized")]
    #[test_case("", WorkloadPhase::Unknown ; "empty")]
    fn test_phase_from_raw(raw: &str, expected: WorkloadPhase) {
        assert_eq!(WorkloadPhase::from_raw(raw), expected);
    }

    #[test]
    fn test_phase_from_str_rejects_unknown_spelling() {
        let err = "bogus".parse::<WorkloadPhase>().unwrap_err();
        assert_eq!(err, ParsePhaseError("bogus".to_string()));
    }

    #[test]
    fn test_node_entry_sorts_workloads() {
        let node = NodeEntry::new(
            "n1",
            vec![pod("b", "default", "n1"), pod("a", "kube-system", "n1"), pod("a", "default", "n1")],
        )
        .unwrap();

        let keys: Vec<_> = node.workloads().iter().map(WorkloadEntry::key).collect();
        assert_eq!(
            keys,
            vec![("default", "a"), ("default", "b"), ("kube-system", "a")]
        );
    }

    #[test]
    fn test_node_entry_rejects_misbound_workload() {
        let err = NodeEntry::new("n1", vec![pod("p1", "default", "n2")]).unwrap_err();
        assert!(matches!(err, BuildError::MisboundWorkload { .. }));

        let unbound = WorkloadEntry::new("p1", "default", WorkloadPhase::Pending);
        let err = NodeEntry::new("n1", vec![unbound]).unwrap_err();
        assert!(matches!(err, BuildError::MisboundWorkload { bound: None, .. }));
    }

    #[test]
    fn test_node_entry_rejects_duplicate_workload() {
        let err = NodeEntry::new("n1", vec![pod("p1", "default", "n1"), pod("p1", "default", "n1")])
            .unwrap_err();
        assert!(matches!(err, BuildError::DuplicateWorkload { .. }));
    }

    #[test]
    fn test_same_name_in_different_namespaces_is_allowed() {
        let node =
            NodeEntry::new("n1", vec![pod("p1", "default", "n1"), pod("p1", "other", "n1")]).unwrap();
        assert_eq!(node.workload_count(), 2);
    }

    #[test]
    fn test_node_entry_rejects_empty_names() {
        assert_eq!(NodeEntry::empty("").unwrap_err(), BuildError::EmptyNodeName);

        let err = NodeEntry::new("n1", vec![pod("", "default", "n1")]).unwrap_err();
        assert!(matches!(err, BuildError::EmptyWorkloadName { .. }));
    }

    #[test]
    fn test_readiness_is_part_of_node_equality() {
        let ready = NodeEntry::empty("n1").unwrap();
        let not_ready = NodeEntry::empty("n1").unwrap().with_status(NodeStatus::NotReady);

        assert_eq!(ready.status(), NodeStatus::Ready);
        assert_ne!(ready, not_ready);
        assert_ne!(
            ClusterState::new(vec![ready]).unwrap(),
            ClusterState::new(vec![not_ready]).unwrap()
        );
    }

    #[test_case(true, NodeStatus::Ready, "Ready" ; "ready")]
    #[test_case(false, NodeStatus::NotReady, "NotReady" ; "not ready")]
    fn test_node_status_from_ready(ready: bool, expected: NodeStatus, spelling: &str) {
        let status = NodeStatus::from_ready(ready);
        assert_eq!(status, expected);
        assert_eq!(status.is_ready(), ready);
        assert_eq!(status.to_string(), spelling);
        assert_eq!(serde_json::to_value(status).unwrap(), serde_json::json!(spelling));
    }

    #[test]
    fn test_cluster_state_sorts_nodes_and_rejects_duplicates() {
        let state = ClusterState::new(vec![
            NodeEntry::empty("n2").unwrap(),
            NodeEntry::empty("n1").unwrap(),
        ])
        .unwrap();
        let names: Vec<_> = state.nodes().iter().map(NodeEntry::name).collect();
        assert_eq!(names, vec!["n1", "n2"]);
        assert!(state.node("n2").is_some());
        assert!(state.node("n3").is_none());

        let err = ClusterState::new(vec![
            NodeEntry::empty("n1").unwrap(),
            NodeEntry::empty("n1").unwrap(),
        ])
        .unwrap_err();
        assert_eq!(err, BuildError::DuplicateNode("n1".to_string()));
    }

    #[test]
    fn test_empty_state_is_valid() {
        let state = ClusterState::new(Vec::new()).unwrap();
        assert!(state.is_empty());
        assert_eq!(state, ClusterState::empty());
        assert_eq!(state.workload_count(), 0);
    }

    #[test]
    fn test_json_shape() {
        let state = ClusterState::new(vec![
            NodeEntry::new("n1", vec![pod("p1", "default", "n1")]).unwrap(),
        ])
        .unwrap();

        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "nodes": [{
                    "name": "n1",
                    "status": "Ready",
                    "workloads": [{
                        "name": "p1",
                        "namespace": "default",
                        "phase": "Running",
                        "node": "n1"
                    }]
                }]
            })
        );

        let decoded: ClusterState = serde_json::from_value(json).unwrap();
        assert_eq!(decoded, state);
    }

    #[test]
    fn test_deserialize_canonicalizes_and_validates() {
        let decoded: ClusterState = serde_json::from_str(
            r#"{"nodes":[{"name":"n2","status":"Ready"},{"name":"n1","workloads":[]}]}"#,
        )
        .unwrap();
        assert_eq!(decoded.nodes()[0].name(), "n1");
        assert_eq!(decoded.nodes()[0].status(), NodeStatus::NotReady);
        assert_eq!(decoded.nodes()[1].status(), NodeStatus::Ready);

        let duplicate = serde_json::from_str::<ClusterState>(
            r#"{"nodes":[{"name":"n1"},{"name":"n1"}]}"#,
        );
        assert!(duplicate.is_err());
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        fn node_names() -> impl Strategy<Value = Vec<String>> {
            prop::collection::btree_set("[a-z]{1,6}", 0..8)
                .prop_map(|set| set.into_iter().collect())
        }

        proptest! {
            #[test]
            fn node_order_does_not_affect_equality(names in node_names(), seed in any::<u64>()) {
                let forward: Vec<_> = names.iter().map(|n| NodeEntry::empty(n.as_str()).unwrap()).collect();
                let mut shuffled = forward.clone();
                let len = shuffled.len();
                if len > 1 {
                    shuffled.rotate_left((seed as usize) % len);
                    shuffled.reverse();
                }

                let a = ClusterState::new(forward).unwrap();
                let b = ClusterState::new(shuffled).unwrap();
                prop_assert_eq!(&a, &b);
                prop_assert_eq!(serde_json::to_string(&a).unwrap(), serde_json::to_string(&b).unwrap());
            }
        }
    }
}
