//! Per-node health state machine.
//!
//! # States
//! - Unknown: registered, never answered
//! - Up: node receives traffic
//! - Down: node excluded from the selector
//!
//! # State Transitions
//! ```text
//! any → Up:    a single good response
//! any → Down:  communication error
//! any → Down:  no answer, and nothing succeeded within the fail limit
//! unchanged:   no answer inside the fail limit, or any other error kind
//! ```
//!
//! Other error kinds prove the node is reachable, so they count as success
//! for the purpose of the fail limit.

use serde::Serialize;
use tokio::time::{Duration, Instant};

use crate::error::ErrorKind;

/// Whether a node may receive traffic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Eligibility {
    Unknown,
    Up,
    Down,
}

impl Eligibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Eligibility::Unknown => "unknown",
            Eligibility::Up => "up",
            Eligibility::Down => "down",
        }
    }
}

/// Health record for a single node. Callers serialize access per node.
#[derive(Debug, Clone)]
pub struct NodeHealth {
    eligibility: Eligibility,
    internal: bool,
    fail_limit: Duration,
    registered_at: Instant,
    last_response: Option<Instant>,
    last_success: Option<Instant>,
    last_failure: Option<Instant>,
}

impl NodeHealth {
    /// A fresh record in the `Unknown` state.
    pub fn new(internal: bool, fail_limit: Duration, now: Instant) -> Self {
        Self {
            eligibility: Eligibility::Unknown,
            internal,
            fail_limit,
            registered_at: now,
            last_response: None,
            last_success: None,
            last_failure: None,
        }
    }

    /// The node answered successfully.
    pub fn responded(&mut self, now: Instant) {
        self.last_response = Some(now);
        self.last_success = Some(now);
        self.eligibility = Eligibility::Up;
    }

    /// The node failed with an error of `kind`.
    pub fn failed(&mut self, kind: ErrorKind, now: Instant) {
        self.last_response = Some(now);
        match kind {
            ErrorKind::Communication => {
                self.last_failure = Some(now);
                self.eligibility = Eligibility::Down;
            }
            ErrorKind::NoAnswer => {
                self.last_failure = Some(now);
                let baseline = self.last_success.unwrap_or(self.registered_at);
                if now.saturating_duration_since(baseline) > self.fail_limit {
                    self.eligibility = Eligibility::Down;
                }
            }
            ErrorKind::Timeout | ErrorKind::Application => {
                self.last_success = Some(now);
            }
        }
    }

    pub fn eligibility(&self) -> Eligibility {
        self.eligibility
    }

    pub fn is_internal(&self) -> bool {
        self.internal
    }

    pub fn last_response(&self) -> Option<Instant> {
        self.last_response
    }

    pub fn last_success(&self) -> Option<Instant> {
        self.last_success
    }

    /// When the node last failed with a communication error or missed answer.
    pub fn last_failure(&self) -> Option<Instant> {
        self.last_failure
    }
}
