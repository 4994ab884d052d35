//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Shutdown (shutdown.rs):
//!     trigger() → every ShutdownSignal wakes
//!     → health monitor stops scheduling sweeps
//!     → in-flight probes get a grace period, then are aborted
//! ```
//!
//! # Design Decisions
//! - Shutdown is a level, not an edge: late subscribers still see it
//! - Shutdown has a bounded grace period: it never waits on a stuck probe

pub mod shutdown;

pub use shutdown::{Shutdown, ShutdownSignal};
