//! Kubernetes API object shapes and their conversion into raw records.
//!
//! Only the fields the collector needs are decoded; everything else in
//! the API response is ignored.

use std::fmt;

use pulse_proto::{RawNode, RawWorkload};
use serde::Deserialize;

/// A resource the collector lists and watches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    /// Cluster nodes.
    Nodes,
    /// Pods in all namespaces.
    Pods,
}

impl Resource {
    /// All watched resources.
    pub const ALL: [Self; 2] = [Self::Nodes, Self::Pods];

    /// Path segments below the API server base URL.
    pub const fn segments(self) -> [&'static str; 3] {
        match self {
            Self::Nodes => ["api", "v1", "nodes"],
            Self::Pods => ["api", "v1", "pods"],
        }
    }

    /// Plural resource name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Nodes => "nodes",
            Self::Pods => "pods",
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Object metadata.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ObjectMeta {
    /// Object name.
    #[serde(default)]
    pub name: String,
    /// Namespace, empty for cluster-scoped objects.
    #[serde(default)]
    pub namespace: String,
}

/// One entry of a node's `status.conditions`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NodeCondition {
    /// Condition type, such as `Ready` or `MemoryPressure`.
    #[serde(rename = "type", default)]
    pub kind: String,
    /// `True`, `False` or `Unknown`.
    #[serde(default)]
    pub status: String,
}

/// Node status fields the collector reads.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NodeStatus {
    /// Reported conditions.
    #[serde(default)]
    pub conditions: Vec<NodeCondition>,
}

impl NodeStatus {
    /// Whether the `Ready` condition is `True`.
    pub fn is_ready(&self) -> bool {
        self.conditions
            .iter()
            .any(|c| c.kind == "Ready" && c.status == "True")
    }
}

/// A node object.
#[derive(Debug, Clone, Deserialize)]
pub struct Node {
    /// Metadata.
    #[serde(default)]
    pub metadata: ObjectMeta,
    /// Status.
    #[serde(default)]
    pub status: NodeStatus,
}

/// Pod spec fields the collector reads.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PodSpec {
    /// Node the pod is bound to.
    #[serde(default)]
    pub node_name: Option<String>,
}

/// Pod status fields the collector reads.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PodStatus {
    /// Lifecycle phase as reported.
    #[serde(default)]
    pub phase: Option<String>,
}

/// A pod object.
#[derive(Debug, Clone, Deserialize)]
pub struct Pod {
    /// Metadata.
    #[serde(default)]
    pub metadata: ObjectMeta,
    /// Spec.
    #[serde(default)]
    pub spec: PodSpec,
    /// Status.
    #[serde(default)]
    pub status: PodStatus,
}

/// A list response.
#[derive(Debug, Clone, Deserialize)]
pub struct List<T> {
    /// Items in the list.
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
}

/// Node list response.
pub type NodeList = List<Node>;

/// Pod list response.
pub type PodList = List<Pod>;

/// One event from a watch stream.
///
/// The object is left undecoded; only the event type matters for
/// triggering a new collection.
#[derive(Debug, Clone, Deserialize)]
pub struct WatchEvent {
    /// `ADDED`, `MODIFIED`, `DELETED`, `BOOKMARK` or `ERROR`.
    #[serde(rename = "type")]
    pub kind: String,
    /// The affected object, or a `Status` for `ERROR` events.
    #[serde(default)]
    pub object: serde_json::Value,
}

impl WatchEvent {
    /// Whether the server reported an error and ended the watch.
    pub fn is_error(&self) -> bool {
        self.kind == "ERROR"
    }

    /// Whether the event reflects a change to the watched objects.
    pub fn is_change(&self) -> bool {
        matches!(self.kind.as_str(), "ADDED" | "MODIFIED" | "DELETED")
    }

    /// Message carried by an `ERROR` event.
    pub fn error_message(&self) -> String {
        self.object
            .get("message")
            .and_then(serde_json::Value::as_str)
            .map_or_else(|| self.object.to_string(), str::to_string)
    }
}

impl From<Node> for RawNode {
    fn from(node: Node) -> Self {
        Self::new(node.metadata.name).with_ready(node.status.is_ready())
    }
}

impl From<Pod> for RawWorkload {
    fn from(pod: Pod) -> Self {
        Self {
            name: pod.metadata.name,
            namespace: pod.metadata.namespace,
            phase: pod.status.phase.unwrap_or_default(),
            node_name: pod.spec.node_name.filter(|n| !n.is_empty()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_decode_node_list() {
        let json = r#"{
            "kind": "NodeList",
            "apiVersion": "v1",
            "metadata": {"resourceVersion": "42"},
            "items": [
                {
                    "metadata": {"name": "n1", "labels": {"role": "worker"}},
                    "status": {"conditions": [
                        {"type": "MemoryPressure", "status": "False"},
                        {"type": "Ready", "status": "True", "reason": "KubeletReady"}
                    ]}
                },
                {"metadata": {"name": "n2"}}
            ]
        }"#;

        let list: NodeList = serde_json::from_str(json).unwrap();
        let nodes: Vec<RawNode> = list.items.into_iter().map(RawNode::from).collect();

        assert_eq!(
            nodes,
            vec![RawNode::new("n1"), RawNode::new("n2").with_ready(false)]
        );
    }

    #[test_case(r#"{"conditions": [{"type": "Ready", "status": "True"}]}"#, true ; "ready true")]
    #[test_case(r#"{"conditions": [{"type": "Ready", "status": "False"}]}"#, false ; "ready false")]
    #[test_case(r#"{"conditions": [{"type": "Ready", "status": "Unknown"}]}"#, false ; "ready unknown")]
    #[test_case(r#"{"conditions": [{"type": "DiskPressure", "status": "True"}]}"#, false ; "no ready condition")]
    #[test_case(r#"{}"#, false ; "no conditions")]
    fn test_node_readiness(status: &str, ready: bool) {
        let status: NodeStatus = serde_json::from_str(status).unwrap();
        assert_eq!(status.is_ready(), ready);
    }

    #[test]
    fn test_decode_pod_list() {
        let json = r#"{
            "items": [
                {
                    "metadata": {"name": "web-1", "namespace": "prod"},
                    "spec": {"nodeName": "n1", "containers": []},
                    "status": {"phase": "Running"}
                },
                {
                    "metadata": {"name": "queued", "namespace": "prod"},
                    "spec": {},
                    "status": {"phase": "Pending"}
                }
            ]
        }"#;

        let list: PodList = serde_json::from_str(json).unwrap();
        let pods: Vec<RawWorkload> = list.items.into_iter().map(RawWorkload::from).collect();

        assert_eq!(
            pods,
            vec![
                RawWorkload::new("web-1", "prod", "Running").on_node("n1"),
                RawWorkload::new("queued", "prod", "Pending"),
            ]
        );
    }

    #[test]
    fn test_pod_without_status_has_empty_phase() {
        let pod: Pod = serde_json::from_str(r#"{"metadata": {"name": "p", "namespace": "d"}}"#).unwrap();
        let raw = RawWorkload::from(pod);

        assert_eq!(raw.phase, "");
        assert_eq!(raw.node_name, None);
    }

    #[test]
    fn test_empty_node_name_means_unbound() {
        let pod: Pod =
            serde_json::from_str(r#"{"metadata": {"name": "p"}, "spec": {"nodeName": ""}}"#).unwrap();
        assert_eq!(RawWorkload::from(pod).node_name, None);
    }

    #[test]
    fn test_list_without_items() {
        let list: NodeList = serde_json::from_str(r#"{"kind": "NodeList"}"#).unwrap();
        assert!(list.items.is_empty());
    }

    #[test_case("ADDED", true, false ; "added")]
    #[test_case("MODIFIED", true, false ; "modified")]
    #[test_case("DELETED", true, false ; "deleted")]
    #[test_case("BOOKMARK", false, false ; "bookmark")]
    #[test_case("ERROR", false, true ; "error")]
    fn test_watch_event_kind(kind: &str, change: bool, error: bool) {
        let event = WatchEvent {
            kind: kind.to_string(),
            object: serde_json::Value::Null,
        };
        assert_eq!(event.is_change(), change);
        assert_eq!(event.is_error(), error);
    }

    #[test]
    fn test_watch_error_message() {
        let event: WatchEvent = serde_json::from_str(
            r#"{"type":"ERROR","object":{"kind":"Status","message":"too old resource version","code":410}}"#,
        )
        .unwrap();

        assert!(event.is_error());
        assert_eq!(event.error_message(), "too old resource version");
    }

    #[test]
    fn test_resource_segments() {
        assert_eq!(Resource::Nodes.segments(), ["api", "v1", "nodes"]);
        assert_eq!(Resource::Pods.segments(), ["api", "v1", "pods"]);
        assert_eq!(Resource::Pods.to_string(), "pods");
    }
}
