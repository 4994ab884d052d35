//! Failover cluster wiring.
//!
//! # Responsibilities
//! - Build the selector, pool, health monitor and dispatcher for one pool
//!   of homogeneous nodes
//! - Keep monitor registration and selector membership in step when nodes
//!   are added or removed at runtime

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use tokio::time::Instant;

use crate::admin::{ClusterView, NodeStatus};
use crate::config::{DispatchConfig, FailoverConfig, MonitorConfig};
use crate::dispatch::{Dispatcher, ErrorSink};
use crate::error::{DispatchResult, NodeError};
use crate::health::{HealthMonitor, HealthReporter, NodeDiagnostics};
use crate::load_balancer::{ManagedPool, Node, Prober, WeightedSelector, DEFAULT_WEIGHT};

/// A node to place in the cluster at construction.
#[derive(Debug, Clone)]
pub struct ClusterNode<T> {
    pub node: T,
    pub weight: u32,
    pub internal: bool,
}

impl<T> ClusterNode<T> {
    pub fn new(node: T) -> Self {
        Self {
            node,
            weight: DEFAULT_WEIGHT,
            internal: false,
        }
    }

    pub fn weight(mut self, weight: u32) -> Self {
        self.weight = weight;
        self
    }

    pub fn internal(mut self, internal: bool) -> Self {
        self.internal = internal;
        self
    }
}

/// Selector, health monitor and dispatcher for one pool of nodes.
pub struct FailoverCluster<T: Node, P: Prober<T>> {
    pool: Arc<ManagedPool<T, P>>,
    monitor: Arc<HealthMonitor<T, ManagedPool<T, P>>>,
    dispatcher: Dispatcher<T>,
    dispatch_config: DispatchConfig,
}

impl<T: Node, P: Prober<T>> FailoverCluster<T, P> {
    /// Build a cluster. Every node starts in rotation; the monitor takes
    /// out the ones that fail. Call [`start`](Self::start) to begin probing.
    pub fn new(
        nodes: impl IntoIterator<Item = ClusterNode<T>>,
        prober: P,
        monitor_config: MonitorConfig,
        dispatch_config: DispatchConfig,
    ) -> Self {
        let selector = Arc::new(WeightedSelector::new());
        let pool = Arc::new(ManagedPool::new(Arc::clone(&selector), prober));
        let monitor = Arc::new(HealthMonitor::new(Arc::clone(&pool), monitor_config));

        let mut dispatcher = Dispatcher::new(selector);
        if dispatch_config.report_outcomes {
            let reporter: Arc<dyn HealthReporter<T>> = monitor.clone();
            dispatcher = dispatcher.with_reporter(reporter);
        }

        let cluster = Self {
            pool,
            monitor,
            dispatcher,
            dispatch_config,
        };
        for entry in nodes {
            cluster.add_node(entry.node, entry.weight, entry.internal);
        }

        tracing::info!(
            nodes = cluster.monitor.node_count(),
            report_outcomes = cluster.dispatch_config.report_outcomes,
            "Failover cluster created"
        );
        cluster
    }

    /// Build a cluster from the monitor and dispatch sections of `config`.
    pub fn from_config(
        config: &FailoverConfig,
        nodes: impl IntoIterator<Item = ClusterNode<T>>,
        prober: P,
    ) -> Self {
        Self::new(nodes, prober, config.monitor.clone(), config.dispatch.clone())
    }

    /// Start the background prober. Must be called inside a Tokio runtime.
    pub fn start(&self) -> bool {
        self.monitor.start()
    }

    /// Register `node` with the monitor and put it into rotation.
    ///
    /// Returns false if the node was already both registered and managed.
    pub fn add_node(&self, node: T, weight: u32, internal: bool) -> bool {
        let registered = self.monitor.register(node.clone(), internal);
        let added = self.pool.add_node(node, weight);
        registered || added
    }

    /// Take `node` out of rotation for good. The monitor keeps its record.
    pub fn remove_node(&self, node: &T) -> bool {
        self.pool.remove_node(node)
    }

    /// See [`Dispatcher::dispatch`].
    pub async fn dispatch<R, F, Fut>(
        &self,
        request_key: i64,
        deadline: Instant,
        perform: F,
    ) -> DispatchResult<R>
    where
        F: FnMut(T) -> Fut,
        Fut: Future<Output = Result<R, NodeError>>,
    {
        self.dispatcher.dispatch(request_key, deadline, perform).await
    }

    /// Dispatch with the configured default timeout as the deadline.
    pub async fn dispatch_with_default_deadline<R, F, Fut>(
        &self,
        request_key: i64,
        perform: F,
    ) -> DispatchResult<R>
    where
        F: FnMut(T) -> Fut,
        Fut: Future<Output = Result<R, NodeError>>,
    {
        let deadline = Instant::now() + self.dispatch_config.default_timeout();
        self.dispatcher.dispatch(request_key, deadline, perform).await
    }

    /// See [`Dispatcher::fill_details`].
    pub async fn fill_details<R, F>(&self, request_key: i64, result: &mut R, fill: F)
    where
        R: ErrorSink + Send,
        F: for<'a> FnOnce(T, &'a mut R) -> BoxFuture<'a, Result<(), NodeError>>,
    {
        self.dispatcher.fill_details(request_key, result, fill).await
    }

    pub fn selector(&self) -> &Arc<WeightedSelector<T>> {
        self.dispatcher.selector()
    }

    pub fn monitor(&self) -> &Arc<HealthMonitor<T, ManagedPool<T, P>>> {
        &self.monitor
    }

    pub fn dispatcher(&self) -> &Dispatcher<T> {
        &self.dispatcher
    }

    /// Health of every registered node, sorted by name.
    pub fn diagnostics(&self) -> Vec<NodeDiagnostics> {
        self.monitor.diagnostics()
    }

    /// Stop probing and wait for the background loop to finish.
    pub async fn shutdown(&self) {
        self.monitor.close().await;
    }
}

impl<T: Node, P: Prober<T>> ClusterView for FailoverCluster<T, P> {
    fn node_statuses(&self) -> Vec<NodeStatus> {
        let table = self.selector().snapshot();
        let managed: HashMap<String, (u32, bool)> = self
            .pool
            .managed()
            .into_iter()
            .map(|(node, weight)| {
                let in_rotation = table.contains(&node);
                (node.to_string(), (weight, in_rotation))
            })
            .collect();

        self.monitor
            .diagnostics()
            .into_iter()
            .filter_map(|health| {
                let (weight, in_rotation) = *managed.get(&health.node)?;
                Some(NodeStatus {
                    health,
                    in_rotation,
                    weight,
                })
            })
            .collect()
    }

    fn rotation_size(&self) -> usize {
        self.selector().node_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::time::Duration;

    struct NoProbe;

    #[async_trait]
    impl Prober<&'static str> for NoProbe {
        async fn probe(&self, _node: &&'static str, _timeout: Duration) -> Result<(), NodeError> {
            Ok(())
        }
    }

    fn cluster() -> FailoverCluster<&'static str, NoProbe> {
        FailoverCluster::new(
            [ClusterNode::new("a"), ClusterNode::new("b").weight(300).internal(true)],
            NoProbe,
            MonitorConfig::default(),
            DispatchConfig::default(),
        )
    }

    #[test]
    fn test_nodes_start_in_rotation() {
        let c = cluster();
        assert_eq!(c.rotation_size(), 2);
        assert_eq!(c.selector().snapshot().total_weight(), 400);
        assert_eq!(c.monitor().node_count(), 2);
        assert!(c
            .diagnostics()
            .iter()
            .all(|d| d.eligibility == crate::health::Eligibility::Unknown));
    }

    #[test]
    fn test_add_and_remove() {
        let c = cluster();
        assert!(c.add_node("c", 100, false));
        assert!(!c.add_node("c", 100, false));
        assert_eq!(c.rotation_size(), 3);

        assert!(c.remove_node(&"c"));
        assert_eq!(c.rotation_size(), 2);
        assert!(c.monitor().is_registered(&"c"));
    }

    #[test]
    fn test_node_statuses() {
        let c = cluster();
        c.monitor()
            .report_failure(&"a", crate::error::ErrorKind::Communication);

        let statuses = c.node_statuses();
        assert_eq!(statuses.len(), 2);
        assert_eq!(statuses[0].health.node, "a");
        assert!(!statuses[0].in_rotation);
        assert_eq!(statuses[0].weight, 100);
        assert!(statuses[1].in_rotation);
        assert_eq!(statuses[1].weight, 300);
        assert!(statuses[1].health.internal);
    }

    #[tokio::test]
    async fn test_removed_node_leaves_status_operational() {
        use crate::admin::handlers::get_status;
        use crate::admin::AdminState;
        use axum::extract::State;

        let c = Arc::new(cluster());
        assert!(c.add_node("c", 100, false));
        assert!(c.remove_node(&"c"));

        let statuses = c.node_statuses();
        assert_eq!(statuses.len(), 2);
        assert!(statuses.iter().all(|s| s.health.node != "c"));

        let status = get_status(State(AdminState { view: c.clone() })).await.0;
        assert_eq!(status.status, "operational");
        assert_eq!(status.nodes_registered, 2);
        assert_eq!(status.nodes_in_rotation, 2);
    }

    #[tokio::test]
    async fn test_dispatch_reports_to_monitor() {
        let c = cluster();
        let result = c
            .dispatch_with_default_deadline(1, |node| async move { Ok::<_, NodeError>(node) })
            .await
            .unwrap();

        assert_eq!(
            c.monitor().eligibility(&result),
            Some(crate::health::Eligibility::Up)
        );
    }
}
