use axum::{extract::State, Json};
use serde::Serialize;

use super::{AdminState, NodeStatus};

#[derive(Debug, Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub nodes_registered: usize,
    pub nodes_in_rotation: usize,
}

pub async fn get_status(State(state): State<AdminState>) -> Json<SystemStatus> {
    let registered = state.view.node_statuses().len();
    let in_rotation = state.view.rotation_size();

    let status = if in_rotation == 0 {
        "unavailable"
    } else if in_rotation < registered {
        "degraded"
    } else {
        "operational"
    };

    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status,
        nodes_registered: registered,
        nodes_in_rotation: in_rotation,
    })
}

pub async fn get_nodes(State(state): State<AdminState>) -> Json<Vec<NodeStatus>> {
    Json(state.view.node_statuses())
}

#[cfg(test)]
mod tests {
    use super::super::{setup_admin_router, ClusterView};
    use super::*;
    use crate::health::{Eligibility, NodeDiagnostics};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use std::sync::Arc;
    use tower::ServiceExt;

    struct FixedView(Vec<NodeStatus>);

    impl ClusterView for FixedView {
        fn node_statuses(&self) -> Vec<NodeStatus> {
            self.0.clone()
        }

        fn rotation_size(&self) -> usize {
            self.0.iter().filter(|s| s.in_rotation).count()
        }
    }

    fn status(name: &str, eligibility: Eligibility, in_rotation: bool) -> NodeStatus {
        NodeStatus {
            health: NodeDiagnostics {
                node: name.to_string(),
                internal: false,
                eligibility,
                last_response_ms_ago: None,
                last_success_ms_ago: None,
                last_failure_ms_ago: None,
            },
            in_rotation,
            weight: 100,
        }
    }

    async fn get_json(view: FixedView, uri: &str) -> serde_json::Value {
        let app = setup_admin_router(Arc::new(view));
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_status_degraded() {
        let view = FixedView(vec![
            status("a", Eligibility::Up, true),
            status("b", Eligibility::Down, false),
        ]);
        let body = get_json(view, "/admin/status").await;

        assert_eq!(body["status"], "degraded");
        assert_eq!(body["nodes_registered"], 2);
        assert_eq!(body["nodes_in_rotation"], 1);
    }

    #[tokio::test]
    async fn test_status_unavailable_when_rotation_empty() {
        let view = FixedView(vec![status("a", Eligibility::Down, false)]);
        let body = get_json(view, "/admin/status").await;
        assert_eq!(body["status"], "unavailable");
    }

    #[tokio::test]
    async fn test_nodes_listing() {
        let view = FixedView(vec![
            status("a", Eligibility::Up, true),
            status("b", Eligibility::Down, false),
        ]);
        let body = get_json(view, "/admin/nodes").await;

        let nodes = body.as_array().unwrap();
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[0]["node"], "a");
        assert_eq!(nodes[0]["eligibility"], "up");
        assert_eq!(nodes[0]["weight"], 100);
        assert_eq!(nodes[1]["in_rotation"], false);
        assert_eq!(nodes[1]["weight"], 100);
    }
}
