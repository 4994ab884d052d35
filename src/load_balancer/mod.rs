//! Load balancing subsystem.
//!
//! # Data Flow
//! ```text
//! Dispatcher → selector.rs (snapshot, select(code, attempt))
//!     → node handle for this attempt
//!
//! Health monitor → pool.rs (PoolOwner::working / failed)
//!     → selector.rs (add / remove, whole-table swap)
//! ```
//!
//! # Design Decisions
//! - Selection is a pure function of (code, attempt, snapshot)
//! - Health only affects membership; the selector never reads health state
//! - Weights live with the pool so a recovered node returns at its weight

pub mod node;
pub mod pool;
pub mod selector;

pub use node::{Node, WeightedEntry, DEFAULT_WEIGHT};
pub use pool::{ManagedPool, PoolOwner, Prober};
pub use selector::{NodeTable, WeightedSelector};
