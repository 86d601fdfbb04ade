//! Structural change detection between cluster states.

use std::collections::BTreeMap;
use std::fmt;

use pulse_proto::{ClusterState, WorkloadPhase};
use serde::Serialize;

/// Check whether `next` differs from `previous`.
///
/// Having no previous state always counts as a change. Both states are
/// canonically ordered by construction, so plain structural equality is
/// order-independent.
#[must_use]
pub fn changed(previous: Option<&ClusterState>, next: &ClusterState) -> bool {
    previous.is_none_or(|prev| prev != next)
}

/// Counts of what differs between two states, for logging.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ChangeSummary {
    /// Nodes present in `next` only.
    pub nodes_added: usize,
    /// Nodes present in `previous` only.
    pub nodes_removed: usize,
    /// Nodes present in both whose readiness changed.
    pub nodes_updated: usize,
    /// Workloads present in `next` only.
    pub workloads_added: usize,
    /// Workloads present in `previous` only.
    pub workloads_removed: usize,
    /// Workloads present in both whose phase or node changed.
    pub workloads_updated: usize,
}

impl ChangeSummary {
    /// Compare two states.
    #[must_use]
    pub fn between(previous: Option<&ClusterState>, next: &ClusterState) -> Self {
        let empty = ClusterState::empty();
        let previous = previous.unwrap_or(&empty);
        let mut summary = Self::default();

        for node in next.nodes() {
            match previous.node(node.name()) {
                None => summary.nodes_added += 1,
                Some(was) if was.status() != node.status() => summary.nodes_updated += 1,
                Some(_) => {}
            }
        }
        for node in previous.nodes() {
            if next.node(node.name()).is_none() {
                summary.nodes_removed += 1;
            }
        }

        let before = index_workloads(previous);
        let after = index_workloads(next);

        for (key, now) in &after {
            match before.get(key) {
                None => summary.workloads_added += 1,
                Some(was) if was != now => summary.workloads_updated += 1,
                Some(_) => {}
            }
        }
        summary.workloads_removed = before.keys().filter(|k| !after.contains_key(*k)).count();

        summary
    }

    /// Check if nothing differs.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

type WorkloadIndex<'a> = BTreeMap<(&'a str, &'a str), (WorkloadPhase, Option<&'a str>)>;

fn index_workloads(state: &ClusterState) -> WorkloadIndex<'_> {
    state
        .workloads()
        .map(|w| (w.key(), (w.phase, w.node.as_deref())))
        .collect()
}

impl fmt::Display for ChangeSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "nodes +{} -{} ~{}, workloads +{} -{} ~{}",
            self.nodes_added,
            self.nodes_removed,
            self.nodes_updated,
            self.workloads_added,
            self.workloads_removed,
            self.workloads_updated
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulse_proto::{NodeEntry, NodeStatus, WorkloadEntry};

    fn state(nodes: &[(&str, &[(&str, WorkloadPhase)])]) -> ClusterState {
        let entries = nodes
            .iter()
            .map(|(node, pods)| {
                let workloads = pods
                    .iter()
                    .map(|(name, phase)| WorkloadEntry::new(*name, "default", *phase).with_node(*node))
                    .collect();
                NodeEntry::new(*node, workloads).unwrap()
            })
            .collect();
        ClusterState::new(entries).unwrap()
    }

    #[test]
    fn test_no_previous_state_is_a_change() {
        assert!(changed(None, &ClusterState::empty()));
        assert!(changed(None, &state(&[("n1", &[])])));
    }

    #[test]
    fn test_identical_states_are_unchanged() {
        let a = state(&[("n1", &[("p1", WorkloadPhase::Running)])]);
        let b = state(&[("n1", &[("p1", WorkloadPhase::Running)])]);
        assert!(!changed(Some(&a), &b));
    }

    #[test]
    fn test_empty_cluster_differs_from_populated() {
        let populated = state(&[("n1", &[])]);
        assert!(changed(Some(&populated), &ClusterState::empty()));
        assert!(changed(Some(&ClusterState::empty()), &populated));
    }

    #[test]
    fn test_phase_change_is_detected() {
        let a = state(&[("n1", &[("p1", WorkloadPhase::Pending)])]);
        let b = state(&[("n1", &[("p1", WorkloadPhase::Running)])]);
        assert!(changed(Some(&a), &b));
    }

    #[test]
    fn test_workload_moving_between_nodes_is_detected() {
        let a = state(&[("n1", &[("p1", WorkloadPhase::Running)]), ("n2", &[])]);
        let b = state(&[("n1", &[]), ("n2", &[("p1", WorkloadPhase::Running)])]);
        assert!(changed(Some(&a), &b));

        let summary = ChangeSummary::between(Some(&a), &b);
        assert_eq!(summary.workloads_updated, 1);
        assert_eq!(summary.workloads_added, 0);
    }

    #[test]
    fn test_readiness_change_is_detected() {
        let ready = state(&[("n1", &[("p1", WorkloadPhase::Running)])]);
        let not_ready = ClusterState::new(vec![
            ready.nodes()[0].clone().with_status(NodeStatus::NotReady),
        ])
        .unwrap();
        assert!(changed(Some(&ready), &not_ready));

        let summary = ChangeSummary::between(Some(&ready), &not_ready);
        assert_eq!(summary.nodes_updated, 1);
        assert_eq!(summary.workloads_updated, 0);
    }

    #[test]
    fn test_summary_counts() {
        let a = state(&[
            ("n1", &[("p1", WorkloadPhase::Running), ("p2", WorkloadPhase::Running)]),
            ("n2", &[]),
        ]);
        let b = state(&[
            ("n1", &[("p1", WorkloadPhase::Failed), ("p3", WorkloadPhase::Pending)]),
            ("n3", &[]),
        ]);

        let summary = ChangeSummary::between(Some(&a), &b);
        assert_eq!(
            summary,
            ChangeSummary {
                nodes_added: 1,
                nodes_removed: 1,
                nodes_updated: 0,
                workloads_added: 1,
                workloads_removed: 1,
                workloads_updated: 1,
            }
        );
        assert_eq!(summary.to_string(), "nodes +1 -1 ~0, workloads +1 -1 ~1");
    }

    #[test]
    fn test_summary_from_nothing() {
        let b = state(&[("n1", &[("p1", WorkloadPhase::Running)])]);
        let summary = ChangeSummary::between(None, &b);
        assert_eq!(summary.nodes_added, 1);
        assert_eq!(summary.workloads_added, 1);
        assert!(ChangeSummary::between(Some(&b), &b).is_empty());
    }
}
