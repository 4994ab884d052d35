//! Node handle abstraction.
//!
//! # Responsibilities
//! - Define what the core requires of a backend handle
//! - Pair a handle with its relative load share

use std::fmt::Display;
use std::hash::Hash;

/// Default relative load share for a node.
pub const DEFAULT_WEIGHT: u32 = 100;

/// An opaque handle to one backend connection.
///
/// The core never constructs or destroys nodes; it only clones, compares,
/// hashes and prints them. Any type with stable identity qualifies.
pub trait Node: Clone + Eq + Hash + Display + Send + Sync + 'static {}

impl<T> Node for T where T: Clone + Eq + Hash + Display + Send + Sync + 'static {}

/// A node together with its weight in the selection table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeightedEntry<T> {
    /// The node handle.
    pub node: T,
    /// Relative load share, always at least 1.
    pub weight: u32,
}

impl<T> WeightedEntry<T> {
    /// Create an entry, clamping the weight to at least 1.
    pub fn new(node: T, weight: u32) -> Self {
        Self {
            node,
            weight: weight.max(1),
        }
    }
}
