//! Active health checking.
//!
//! # Responsibilities
//! - Periodically probe every registered node
//! - Run each probe as its own task with its own deadline
//! - Feed every probe outcome back into the monitor, exactly once

use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::{AbortHandle, JoinSet};
use tokio::time::{self, MissedTickBehavior};

use crate::config::MonitorConfig;
use crate::error::{ErrorKind, NodeError};
use crate::health::monitor::{call_owner_hook, HealthMonitor};
use crate::lifecycle::ShutdownSignal;
use crate::load_balancer::node::Node;
use crate::load_balancer::pool::PoolOwner;
use crate::observability::metrics;

/// Background sweep loop. Exits on shutdown or when the monitor is dropped.
pub(crate) async fn run<T: Node, O: PoolOwner<T>>(
    monitor: Weak<HealthMonitor<T, O>>,
    config: MonitorConfig,
    mut shutdown: ShutdownSignal,
) {
    tracing::info!(
        interval_ms = config.probe_interval_ms,
        deadline_ms = config.probe_deadline_ms,
        fail_limit_ms = config.fail_limit_ms,
        "Health monitor starting"
    );

    let mut ticker = time::interval(config.probe_interval().max(Duration::from_millis(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let permits = Arc::new(Semaphore::new(config.max_concurrent_probes.max(1)));
    let mut probes = JoinSet::new();

    loop {
        tokio::select! {
            biased;

            _ = shutdown.recv() => {
                tracing::info!("Health monitor received shutdown signal, exiting loop");
                break;
            }
            _ = ticker.tick() => {
                let Some(monitor) = monitor.upgrade() else {
                    break;
                };
                let issued = sweep(&monitor, &mut probes, &permits);
                tracing::trace!(issued, in_flight = probes.len(), "Probe sweep issued");
            }
            Some(joined) = probes.join_next() => {
                if let Err(e) = joined {
                    tracing::error!(error = %e, "Probe task failed");
                }
            }
        }
    }

    drain(probes, config.shutdown_grace()).await;
}

/// Issue one probe per registered node. Returns the number issued.
fn sweep<T: Node, O: PoolOwner<T>>(
    monitor: &Arc<HealthMonitor<T, O>>,
    probes: &mut JoinSet<()>,
    permits: &Arc<Semaphore>,
) -> usize {
    let mut issued = 0;
    for node in monitor.nodes() {
        if monitor.is_closed() {
            return issued;
        }
        let monitor = Arc::clone(monitor);
        let permits = Arc::clone(permits);
        probes.spawn(async move {
            let Ok(_permit) = permits.acquire_owned().await else {
                return;
            };
            let outcome = probe_node(&monitor, &node).await;
            record_outcome(&monitor, &node, outcome);
        });
        issued += 1;
    }
    call_owner_hook("sweep_completed", || monitor.owner().sweep_completed());
    issued
}

/// Run the owner's probe for `node` in its own task, bounded by the probe
/// deadline. Panics and deadline overruns become failures. The probe task
/// never outlives this call.
async fn probe_node<T: Node, O: PoolOwner<T>>(
    monitor: &HealthMonitor<T, O>,
    node: &T,
) -> Result<(), NodeError> {
    let owner = Arc::clone(monitor.owner());
    let target = node.clone();
    let request_timeout = monitor.config().probe_request_timeout();
    let deadline = monitor.config().probe_deadline();

    let task = tokio::spawn(async move { owner.probe(&target, request_timeout).await });
    // Also fires when this future is dropped, e.g. by the shutdown abort.
    let _abort = AbortOnDrop(task.abort_handle());

    match time::timeout(deadline, task).await {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(e)) => Err(NodeError::Communication(format!("probe faulted: {}", e))),
        Err(_) => Err(NodeError::NoAnswer(format!(
            "no answer within {} ms",
            deadline.as_millis()
        ))),
    }
}

struct AbortOnDrop(AbortHandle);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

fn record_outcome<T: Node, O: PoolOwner<T>>(
    monitor: &HealthMonitor<T, O>,
    node: &T,
    outcome: Result<(), NodeError>,
) {
    match outcome {
        Ok(()) => {
            metrics::record_probe("success");
            monitor.report_success(node);
        }
        Err(e) => {
            // A probe that times out on its own is as silent as one we gave up on.
            let kind = match e.kind() {
                ErrorKind::Timeout => ErrorKind::NoAnswer,
                kind => kind,
            };
            metrics::record_probe(kind.as_str());
            tracing::debug!(node = %node, error = %e, "Probe failed");
            monitor.report_failure(node, kind);
        }
    }
}

/// Give in-flight probes up to `grace` to finish, then abort the rest.
async fn drain(mut probes: JoinSet<()>, grace: Duration) {
    if probes.is_empty() {
        return;
    }
    let drained = time::timeout(grace, async {
        while probes.join_next().await.is_some() {}
    })
    .await;

    if drained.is_err() {
        tracing::warn!(pending = probes.len(), "Abandoning in-flight probes after grace period");
        probes.abort_all();
    }
}
