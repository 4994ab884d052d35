//! Metrics collection and exposition.
//!
//! # Metrics
//! - `cluster_node_eligible` (gauge): 1=up, 0=down, per node
//! - `cluster_probe_total` (counter): probe outcomes, per outcome
//! - `cluster_dispatch_total` (counter): dispatch results, per outcome
//! - `cluster_dispatch_attempts` (histogram): attempts used per dispatch
//! - `cluster_dispatch_duration_seconds` (histogram): dispatch latency
//!
//! Recording is a no-op until a recorder is installed.

use std::net::SocketAddr;
use tokio::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter with an HTTP listener on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record whether a node is in rotation.
pub fn record_node_eligibility(node: &str, eligible: bool) {
    gauge!("cluster_node_eligible", "node" => node.to_string()).set(if eligible { 1.0 } else { 0.0 });
}

/// Record the outcome of one probe.
pub fn record_probe(outcome: &'static str) {
    counter!("cluster_probe_total", "outcome" => outcome).increment(1);
}

/// Record a finished dispatch.
pub fn record_dispatch(outcome: &'static str, attempts: usize, start: Instant) {
    counter!("cluster_dispatch_total", "outcome" => outcome).increment(1);
    histogram!("cluster_dispatch_attempts").record(attempts as f64);
    histogram!("cluster_dispatch_duration_seconds").record(start.elapsed().as_secs_f64());
}
