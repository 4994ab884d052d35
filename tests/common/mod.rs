//! Shared utilities for integration tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashSet;

use cluster_dispatch::config::{DispatchConfig, MonitorConfig};
use cluster_dispatch::{ClusterNode, FailoverCluster, NodeError, Prober};

/// Prober whose answer per node can be flipped while the cluster runs.
#[derive(Default)]
pub struct SwitchProber {
    down: DashSet<&'static str>,
    probes: AtomicUsize,
}

impl SwitchProber {
    pub fn set_down(&self, node: &'static str) {
        self.down.insert(node);
    }

    pub fn set_up(&self, node: &'static str) {
        self.down.remove(&node);
    }

    #[allow(dead_code)]
    pub fn probe_count(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Prober<&'static str> for SwitchProber {
    async fn probe(&self, node: &&'static str, _timeout: Duration) -> Result<(), NodeError> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        if self.down.contains(node) {
            Err(NodeError::Communication(format!("{node}: connection refused")))
        } else {
            Ok(())
        }
    }
}

pub type TestCluster = FailoverCluster<&'static str, Arc<SwitchProber>>;

pub fn monitor_config() -> MonitorConfig {
    MonitorConfig {
        probe_interval_ms: 1000,
        probe_deadline_ms: 980,
        probe_request_timeout_ms: 980,
        fail_limit_ms: 5000,
        ..MonitorConfig::default()
    }
}

/// Build and start a cluster of equally weighted nodes.
pub fn started_cluster(nodes: &[&'static str], prober: &Arc<SwitchProber>) -> TestCluster {
    let cluster = FailoverCluster::new(
        nodes.iter().map(|n| ClusterNode::new(*n)),
        Arc::clone(prober),
        monitor_config(),
        DispatchConfig::default(),
    );
    assert!(cluster.start());
    cluster
}
