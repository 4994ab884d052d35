//! Network-facing node types.
//!
//! # Design Decisions
//! - A TCP connect is the cheapest liveness check that needs no protocol
//!   knowledge
//! - Refused connections and silent ones map to different error kinds so the
//!   health state machine can treat them differently

pub mod tcp;

pub use tcp::{TcpNode, TcpProber};
