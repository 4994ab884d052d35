//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Active health checks (active.rs):
//!     Periodic ticker
//!     → One probe task per node, each with its own deadline
//!     → monitor.rs (report_success / report_failure)
//!
//! Passive health checks (passive.rs):
//!     Request outcome observed by the dispatcher
//!     → monitor.rs (report_success / report_failure)
//!
//! State machine (state.rs):
//!     Unknown → Up / Down, Up ←→ Down
//!     Missed probes only count after the fail limit
//!
//! Transitions:
//!     monitor.rs → PoolOwner::working / failed → selector membership
//! ```
//!
//! # Design Decisions
//! - Active and passive checks are complementary and feed the same state
//! - Health state is per node, each record behind its own lock
//! - A probe that panics or overruns is a failure, never a skipped report

mod active;
pub mod monitor;
pub mod passive;
pub mod state;

#[cfg(test)]
pub(crate) mod test_support;

pub use monitor::{HealthMonitor, NodeDiagnostics};
pub use passive::HealthReporter;
pub use state::{Eligibility, NodeHealth};
