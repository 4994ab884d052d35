//! Health monitor.
//!
//! # Responsibilities
//! - Own the node → health record map
//! - Apply success/failure events under a per-node lock
//! - Tell the pool owner about eligibility transitions, once per transition
//! - Drive the background prober (see active.rs)

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::config::MonitorConfig;
use crate::error::{panic_message, ErrorKind};
use crate::health::active;
use crate::health::passive::HealthReporter;
use crate::health::state::{Eligibility, NodeHealth};
use crate::lifecycle::Shutdown;
use crate::load_balancer::node::Node;
use crate::load_balancer::pool::PoolOwner;
use crate::observability::metrics;

/// Point-in-time view of one node's health, for monitoring endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeDiagnostics {
    pub node: String,
    pub internal: bool,
    pub eligibility: Eligibility,
    pub last_response_ms_ago: Option<u64>,
    pub last_success_ms_ago: Option<u64>,
    pub last_failure_ms_ago: Option<u64>,
}

impl NodeDiagnostics {
    fn new(node: String, health: &NodeHealth, now: Instant) -> Self {
        let ago = |t: Option<Instant>| t.map(|t| now.saturating_duration_since(t).as_millis() as u64);
        Self {
            node,
            internal: health.is_internal(),
            eligibility: health.eligibility(),
            last_response_ms_ago: ago(health.last_response()),
            last_success_ms_ago: ago(health.last_success()),
            last_failure_ms_ago: ago(health.last_failure()),
        }
    }
}

/// Tracks node health and keeps a pool owner informed of transitions.
pub struct HealthMonitor<T: Node, O: PoolOwner<T>> {
    owner: Arc<O>,
    config: MonitorConfig,
    nodes: DashMap<T, Arc<Mutex<NodeHealth>>>,
    closed: AtomicBool,
    shutdown: Shutdown,
    prober: Mutex<Option<JoinHandle<()>>>,
}

impl<T: Node, O: PoolOwner<T>> HealthMonitor<T, O> {
    pub fn new(owner: Arc<O>, config: MonitorConfig) -> Self {
        Self {
            owner,
            config,
            nodes: DashMap::new(),
            closed: AtomicBool::new(false),
            shutdown: Shutdown::new(),
            prober: Mutex::new(None),
        }
    }

    /// Spawn the background prober. Must be called inside a Tokio runtime.
    ///
    /// Returns false if probing is disabled, already running, or the monitor
    /// has been shut down.
    pub fn start(self: &Arc<Self>) -> bool {
        if !self.config.enabled {
            tracing::info!("Active health checks disabled");
            return false;
        }
        if self.is_closed() {
            return false;
        }

        let mut slot = self.prober.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.is_some() {
            return false;
        }
        let signal = self.shutdown.subscribe();
        *slot = Some(tokio::spawn(active::run(
            Arc::downgrade(self),
            self.config.clone(),
            signal,
        )));
        true
    }

    /// Start tracking `node`. Returns false if it was already registered.
    pub fn register(&self, node: T, internal: bool) -> bool {
        if self.is_closed() {
            return false;
        }
        match self.nodes.entry(node) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                tracing::debug!(node = %slot.key(), internal, "Node registered");
                let health = NodeHealth::new(internal, self.config.fail_limit(), Instant::now());
                slot.insert(Arc::new(Mutex::new(health)));
                true
            }
        }
    }

    /// Record a successful response from `node`.
    pub fn report_success(&self, node: &T) {
        self.apply(node, |health, now| health.responded(now));
    }

    /// Record a failure of `kind` from `node`.
    pub fn report_failure(&self, node: &T, kind: ErrorKind) {
        self.apply(node, |health, now| health.failed(kind, now));
    }

    fn apply(&self, node: &T, event: impl FnOnce(&mut NodeHealth, Instant)) {
        if self.is_closed() {
            return;
        }
        let Some(record) = self.nodes.get(node).map(|e| Arc::clone(e.value())) else {
            tracing::debug!(node = %node, "Ignoring event for unregistered node");
            return;
        };

        let mut health = record.lock().unwrap_or_else(PoisonError::into_inner);
        let before = health.eligibility();
        event(&mut *health, Instant::now());
        let after = health.eligibility();
        if before == after || self.is_closed() {
            return;
        }

        // Still under the node lock, so the owner sees this node's
        // transitions in the order they happened.
        match after {
            Eligibility::Up => {
                tracing::info!(node = %node, from = before.as_str(), "Node is working");
                metrics::record_node_eligibility(&node.to_string(), true);
                call_owner_hook("working", || self.owner.working(node));
            }
            Eligibility::Down => {
                tracing::warn!(
                    node = %node,
                    from = before.as_str(),
                    internal = health.is_internal(),
                    "Node failed"
                );
                metrics::record_node_eligibility(&node.to_string(), false);
                call_owner_hook("failed", || self.owner.failed(node));
            }
            Eligibility::Unknown => {}
        }
    }

    /// Current eligibility of `node`, if registered.
    pub fn eligibility(&self, node: &T) -> Option<Eligibility> {
        let record = self.nodes.get(node).map(|e| Arc::clone(e.value()))?;
        let health = record.lock().unwrap_or_else(PoisonError::into_inner);
        Some(health.eligibility())
    }

    pub fn is_registered(&self, node: &T) -> bool {
        self.nodes.contains_key(node)
    }

    /// All registered nodes.
    pub fn nodes(&self) -> Vec<T> {
        self.nodes.iter().map(|e| e.key().clone()).collect()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Health of every registered node, sorted by node name.
    pub fn diagnostics(&self) -> Vec<NodeDiagnostics> {
        let records: Vec<(String, Arc<Mutex<NodeHealth>>)> = self
            .nodes
            .iter()
            .map(|e| (e.key().to_string(), Arc::clone(e.value())))
            .collect();

        let now = Instant::now();
        let mut out: Vec<NodeDiagnostics> = records
            .into_iter()
            .map(|(name, record)| {
                let health = record.lock().unwrap_or_else(PoisonError::into_inner);
                NodeDiagnostics::new(name, &health, now)
            })
            .collect();
        out.sort_by(|a, b| a.node.cmp(&b.node));
        out
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    pub fn owner(&self) -> &Arc<O> {
        &self.owner
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Stop the monitor. Idempotent.
    ///
    /// After this returns, events are ignored and the node map is empty.
    /// The background loop is woken and winds down on its own; use
    /// [`close`](Self::close) to wait for it.
    pub fn shutdown(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.nodes.clear();
        self.shutdown.trigger();
        tracing::info!("Health monitor shut down");
    }

    /// Shut down and wait for the background loop to finish.
    pub async fn close(&self) {
        self.shutdown();
        let handle = self
            .prober
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "Health monitor loop ended abnormally");
            }
        }
    }
}

/// Run a pool owner hook. A panic is logged and does not propagate.
pub(crate) fn call_owner_hook(hook: &'static str, f: impl FnOnce()) {
    if let Err(panic) = catch_unwind(AssertUnwindSafe(f)) {
        tracing::error!(hook, error = %panic_message(panic.as_ref()), "Pool owner hook panicked");
    }
}

impl<T: Node, O: PoolOwner<T>> HealthReporter<T> for HealthMonitor<T, O> {
    fn report_success(&self, node: &T) {
        HealthMonitor::report_success(self, node);
    }

    fn report_failure(&self, node: &T, kind: ErrorKind) {
        HealthMonitor::report_failure(self, node, kind);
    }
}
