//! Passive health reporting.
//!
//! # Responsibilities
//! - Let the request path feed live outcomes into the monitor
//!   faster than the next scheduled probe
//!
//! # Design Decisions
//! - Write-only: the request path never reads health state for its
//!   retry decisions
//! - Every error kind is reported; the state machine decides what counts

use crate::error::ErrorKind;
use crate::load_balancer::node::Node;

/// Sink for per-node outcomes observed outside the probe loop.
pub trait HealthReporter<T: Node>: Send + Sync {
    fn report_success(&self, node: &T);

    fn report_failure(&self, node: &T, kind: ErrorKind);
}
