//! HTTP request handlers for the dashboard API.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Query, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use futures::{Stream, StreamExt};
use pulse_core::{StatsSnapshot, StoreSnapshot};
use pulse_proto::{NodeStatus, WorkloadEntry, WorkloadPhase};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{DashboardError, DashboardResult};
use crate::state::DashboardState;

/// Name of the event carrying a full cluster state.
pub const UPDATED_EVENT: &str = "updated";

/// Query parameters for workload filtering.
#[derive(Debug, Default, Deserialize)]
pub struct PodQuery {
    /// Only workloads in this namespace.
    pub namespace: Option<String>,
    /// Only workloads in this phase (case-insensitive).
    pub phase: Option<String>,
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Status message.
    pub status: String,
    /// Server uptime in seconds.
    pub uptime_secs: u64,
}

/// One row of the node listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeSummary {
    /// Node name.
    pub name: String,
    /// `Ready` or `NotReady`.
    pub status: NodeStatus,
    /// Workloads bound to the node.
    pub workload_count: usize,
}

/// Pipeline and stream counters.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    /// Whether a state has been collected.
    pub initialized: bool,
    /// Store generation; bumped on every installed change.
    pub generation: u64,
    /// Nodes in the current state.
    pub nodes: usize,
    /// Workloads in the current state.
    pub workloads: usize,
    /// Sessions attached to the broadcaster.
    pub sessions: usize,
    /// Open event streams.
    pub streams: usize,
    /// Notifications published.
    pub published: u64,
    /// Notifications dropped on full session buffers.
    pub dropped: u64,
    /// Collection counters.
    pub pipeline: StatsSnapshot,
    /// Server uptime in seconds.
    pub uptime_secs: u64,
}

/// Handle GET /api/health - health check endpoint.
pub async fn health_check(State(state): State<Arc<DashboardState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        uptime_secs: state.uptime_secs(),
    })
}

/// Handle GET /api/status - pipeline statistics.
pub async fn get_status(State(state): State<Arc<DashboardState>>) -> Json<StatusResponse> {
    let pipeline = state.pipeline();
    let broadcaster = pipeline.broadcaster();
    let current = pipeline.store().versioned();

    Json(StatusResponse {
        initialized: current.is_initialized(),
        generation: current.generation,
        nodes: current.state.as_ref().map_or(0, |s| s.node_count()),
        workloads: current.state.as_ref().map_or(0, |s| s.workload_count()),
        sessions: broadcaster.session_count(),
        streams: state.stream_count(),
        published: broadcaster.published_total(),
        dropped: broadcaster.dropped_total(),
        pipeline: pipeline.stats().snapshot(),
        uptime_secs: state.uptime_secs(),
    })
}

/// Handle GET /api/state - the full cluster state.
pub async fn get_state(State(state): State<Arc<DashboardState>>) -> DashboardResult<Response> {
    let current = state.current()?;
    Ok(Json(current.as_ref()).into_response())
}

/// Handle GET /api/nodes - list nodes with their readiness and workload counts.
pub async fn list_nodes(
    State(state): State<Arc<DashboardState>>,
) -> DashboardResult<Json<Vec<NodeSummary>>> {
    let current = state.current()?;
    let nodes = current
        .nodes()
        .iter()
        .map(|node| NodeSummary {
            name: node.name().to_string(),
            status: node.status(),
            workload_count: node.workload_count(),
        })
        .collect();
    Ok(Json(nodes))
}

/// Handle GET /api/pods - list workloads across all nodes.
pub async fn list_pods(
    State(state): State<Arc<DashboardState>>,
    Query(query): Query<PodQuery>,
) -> DashboardResult<Json<Vec<WorkloadEntry>>> {
    let phase = query
        .phase
        .as_deref()
        .map(str::parse::<WorkloadPhase>)
        .transpose()
        .map_err(|e| DashboardError::InvalidRequest(e.to_string()))?;

    let current = state.current()?;
    let pods = current
        .workloads()
        .filter(|w| query.namespace.as_deref().is_none_or(|ns| w.namespace == ns))
        .filter(|w| phase.is_none_or(|p| w.phase == p))
        .cloned()
        .collect();
    Ok(Json(pods))
}

/// Handle GET /api/events - SSE stream of cluster state.
///
/// The first event carries the state at connect time (`null` before the
/// first collection); each later event carries the state after a change.
pub async fn stream_events(
    State(state): State<Arc<DashboardState>>,
) -> DashboardResult<Sse<impl Stream<Item = Result<Event, axum::Error>>>> {
    let guard = state.acquire_stream()?;
    let session = state.open_session();
    info!(streams = state.stream_count(), "event stream opened");

    let stream = guard.hold(session.into_stream().map(|frame| updated_event(&frame)));

    Ok(Sse::new(stream).keep_alive(KeepAlive::new().interval(state.config().keep_alive)))
}

/// Build the `updated` event for a store snapshot.
pub fn updated_event(frame: &StoreSnapshot) -> Result<Event, axum::Error> {
    Event::default()
        .event(UPDATED_EVENT)
        .id(frame.generation.to_string())
        .json_data(frame.state.as_deref())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulse_core::{Pipeline, PipelineConfig};
    use pulse_proto::{ClusterState, NodeEntry};
    use tokio_util::sync::CancellationToken;

    fn make_state() -> Arc<DashboardState> {
        Arc::new(DashboardState::new(
            crate::config::DashboardConfig::default(),
            Pipeline::new(PipelineConfig::default()),
            CancellationToken::new(),
        ))
    }

    fn install(state: &DashboardState) {
        let nodes = vec![
            NodeEntry::new(
                "n1",
                vec![
                    WorkloadEntry::new("api", "prod", WorkloadPhase::Running).with_node("n1"),
                    WorkloadEntry::new("job", "batch", WorkloadPhase::Failed).with_node("n1"),
                ],
            )
            .unwrap(),
            NodeEntry::empty("n2").unwrap().with_status(NodeStatus::NotReady),
        ];
        state.store().swap_if_changed(ClusterState::new(nodes).unwrap());
    }

    #[tokio::test]
    async fn test_list_nodes() {
        let state = make_state();
        install(&state);

        let Json(nodes) = list_nodes(State(state)).await.unwrap();

        assert_eq!(
            nodes,
            vec![
                NodeSummary {
                    name: "n1".into(),
                    status: NodeStatus::Ready,
                    workload_count: 2,
                },
                NodeSummary {
                    name: "n2".into(),
                    status: NodeStatus::NotReady,
                    workload_count: 0,
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_node_summary_json() {
        let state = make_state();
        install(&state);

        let Json(nodes) = list_nodes(State(state)).await.unwrap();

        assert_eq!(
            serde_json::to_value(&nodes[1]).unwrap(),
            serde_json::json!({"name": "n2", "status": "NotReady", "workload_count": 0})
        );
    }

    #[tokio::test]
    async fn test_list_nodes_not_ready() {
        let err = list_nodes(State(make_state())).await.unwrap_err();
        assert!(matches!(err, DashboardError::NotReady));
    }

    #[tokio::test]
    async fn test_list_pods_filters() {
        let state = make_state();
        install(&state);

        let Json(all) = list_pods(State(state.clone()), Query(PodQuery::default())).await.unwrap();
        assert_eq!(all.len(), 2);

        let query = PodQuery {
            namespace: Some("prod".into()),
            phase: None,
        };
        let Json(prod) = list_pods(State(state.clone()), Query(query)).await.unwrap();
        assert_eq!(prod.len(), 1);
        assert_eq!(prod[0].name, "api");

        let query = PodQuery {
            namespace: None,
            phase: Some("failed".into()),
        };
        let Json(failed) = list_pods(State(state), Query(query)).await.unwrap();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].name, "job");
    }

    #[tokio::test]
    async fn test_list_pods_invalid_phase() {
        let state = make_state();
        install(&state);
        let query = PodQuery {
            namespace: None,
            phase: Some("sleeping".into()),
        };

        let err = list_pods(State(state), Query(query)).await.unwrap_err();
        assert!(matches!(err, DashboardError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_status_counts() {
        let state = make_state();
        install(&state);

        let Json(status) = get_status(State(state)).await;

        assert!(status.initialized);
        assert_eq!(status.generation, 1);
        assert_eq!(status.nodes, 2);
        assert_eq!(status.workloads, 2);
        assert_eq!(status.streams, 0);
    }
}
