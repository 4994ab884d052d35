//! Admin diagnostics surface.
//!
//! Read-only view of node health and rotation for monitoring endpoints.

pub mod handlers;

use std::sync::Arc;

use axum::{routing::get, Router};
use serde::Serialize;
use tower_http::trace::TraceLayer;

use crate::health::NodeDiagnostics;
use self::handlers::{get_nodes, get_status};

/// Health and rotation state of one managed node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeStatus {
    #[serde(flatten)]
    pub health: NodeDiagnostics,
    pub in_rotation: bool,
    pub weight: u32,
}

/// Something that can describe its nodes to the admin endpoints.
pub trait ClusterView: Send + Sync {
    /// Managed nodes only. Removed nodes are not listed.
    fn node_statuses(&self) -> Vec<NodeStatus>;

    fn rotation_size(&self) -> usize;
}

/// State shared by admin handlers.
#[derive(Clone)]
pub struct AdminState {
    pub view: Arc<dyn ClusterView>,
}

pub fn setup_admin_router(view: Arc<dyn ClusterView>) -> Router {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/nodes", get(get_nodes))
        .layer(TraceLayer::new_for_http())
        .with_state(AdminState { view })
}
