//! Normalization of raw collector output into a canonical [`ClusterState`].

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use pulse_proto::{
    BuildError, ClusterState, NodeEntry, NodeStatus, RawNode, RawSnapshot, RawWorkload,
    WorkloadEntry, WorkloadPhase,
};
use tracing::trace;

/// Build a canonical cluster state from raw nodes and workloads.
///
/// One [`NodeEntry`] is created per raw node, carrying its readiness. Each workload is placed under
/// the node it is bound to; workloads that are unscheduled or bound to a node
/// missing from `nodes` belong to no known node and are left out. Nodes are
/// ordered by name and workloads by `(namespace, name)`, so the same input in
/// any order yields an identical state.
///
/// # Errors
///
/// Fails if a node name is empty or repeats, or if a placed workload has no
/// name or repeats on its node.
pub fn build(nodes: Vec<RawNode>, workloads: Vec<RawWorkload>) -> Result<ClusterState, BuildError> {
    let mut placed: BTreeMap<String, (NodeStatus, Vec<WorkloadEntry>)> = BTreeMap::new();

    for node in nodes {
        if node.name.is_empty() {
            return Err(BuildError::EmptyNodeName);
        }
        match placed.entry(node.name) {
            Entry::Vacant(slot) => {
                slot.insert((NodeStatus::from_ready(node.ready), Vec::new()));
            }
            Entry::Occupied(slot) => return Err(BuildError::DuplicateNode(slot.key().clone())),
        }
    }

    let mut orphaned = 0usize;
    for workload in workloads {
        let Some((_, list)) = workload.node_name.as_ref().and_then(|n| placed.get_mut(n)) else {
            trace!(
                namespace = %workload.namespace,
                name = %workload.name,
                node = ?workload.node_name,
                "workload not on a known node"
            );
            orphaned += 1;
            continue;
        };
        list.push(WorkloadEntry {
            phase: WorkloadPhase::from_raw(&workload.phase),
            name: workload.name,
            namespace: workload.namespace,
            node: workload.node_name,
        });
    }

    if orphaned > 0 {
        trace!(count = orphaned, "omitted workloads without a known node");
    }

    let entries = placed
        .into_iter()
        .map(|(name, (status, workloads))| {
            NodeEntry::new(name, workloads).map(|node| node.with_status(status))
        })
        .collect::<Result<Vec<_>, _>>()?;

    ClusterState::new(entries)
}

/// Build a canonical cluster state from a collector's [`RawSnapshot`].
///
/// # Errors
///
/// See [`build`].
pub fn build_snapshot(raw: RawSnapshot) -> Result<ClusterState, BuildError> {
    build(raw.nodes, raw.workloads)
}
