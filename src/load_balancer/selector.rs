//! Weighted node selection table.
//!
//! # Responsibilities
//! - Hold the set of nodes currently in rotation, with weights
//! - Pick a node deterministically from a request code and attempt index
//! - Publish membership changes as whole new snapshots
//!
//! # Design Decisions
//! - Snapshots are immutable; add/remove build a new table and swap it in
//! - Readers take a lock-free atomic load and never see a torn table
//! - Writers are serialized so concurrent add/remove cannot lose updates

use std::sync::{Arc, Mutex, PoisonError};

use arc_swap::ArcSwap;

use crate::load_balancer::node::{Node, WeightedEntry};

/// Multiplier that spreads low-entropy request codes across the weight range.
const SPREAD_PRIME: i64 = 76103;

/// An immutable snapshot of the selection table.
#[derive(Debug, Clone)]
pub struct NodeTable<T> {
    entries: Vec<WeightedEntry<T>>,
    total_weight: u64,
}

impl<T> Default for NodeTable<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            total_weight: 0,
        }
    }
}

impl<T: Node> NodeTable<T> {
    fn from_entries(entries: Vec<WeightedEntry<T>>) -> Self {
        let total_weight = entries.iter().map(|e| u64::from(e.weight)).sum();
        Self {
            entries,
            total_weight,
        }
    }

    /// Select the node for `code` on the given zero-based `attempt`.
    ///
    /// Attempt 0 lands on the entry owning `|code * prime| mod total_weight`
    /// in the cumulative weight scan. Each further attempt steps one entry
    /// forward, so attempts `0..node_count()` visit every node exactly once.
    pub fn select(&self, code: i64, attempt: usize) -> Option<&T> {
        if self.total_weight == 0 {
            return None;
        }

        let hash_value = code.wrapping_mul(SPREAD_PRIME).unsigned_abs() % self.total_weight;

        let mut cumulative = 0u64;
        let mut owner = 0;
        for (index, entry) in self.entries.iter().enumerate() {
            cumulative += u64::from(entry.weight);
            if hash_value < cumulative {
                owner = index;
                break;
            }
        }

        let index = (owner + attempt % self.entries.len()) % self.entries.len();
        self.entries.get(index).map(|e| &e.node)
    }

    /// Whether `node` is in this snapshot.
    pub fn contains(&self, node: &T) -> bool {
        self.entries.iter().any(|e| &e.node == node)
    }

    /// Number of nodes in this snapshot.
    pub fn node_count(&self) -> usize {
        self.entries.len()
    }

    /// Sum of all weights.
    pub fn total_weight(&self) -> u64 {
        self.total_weight
    }

    /// Nodes in rotation order.
    pub fn nodes(&self) -> impl Iterator<Item = &T> {
        self.entries.iter().map(|e| &e.node)
    }

    /// Entries in rotation order.
    pub fn entries(&self) -> &[WeightedEntry<T>] {
        &self.entries
    }
}

/// The live selection table shared by the request path and the monitor.
#[derive(Debug)]
pub struct WeightedSelector<T> {
    table: ArcSwap<NodeTable<T>>,
    write_lock: Mutex<()>,
}

impl<T: Node> Default for WeightedSelector<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Node> WeightedSelector<T> {
    /// Create an empty selector.
    pub fn new() -> Self {
        Self {
            table: ArcSwap::from_pointee(NodeTable::default()),
            write_lock: Mutex::new(()),
        }
    }

    /// Create a selector holding the given entries, skipping duplicates.
    pub fn with_entries(entries: impl IntoIterator<Item = WeightedEntry<T>>) -> Self {
        let mut unique: Vec<WeightedEntry<T>> = Vec::new();
        for entry in entries {
            if !unique.iter().any(|e| e.node == entry.node) {
                unique.push(WeightedEntry::new(entry.node, entry.weight));
            }
        }
        Self {
            table: ArcSwap::from_pointee(NodeTable::from_entries(unique)),
            write_lock: Mutex::new(()),
        }
    }

    /// The current snapshot.
    pub fn snapshot(&self) -> Arc<NodeTable<T>> {
        self.table.load_full()
    }

    /// Select from the current snapshot.
    pub fn select(&self, code: i64, attempt: usize) -> Option<T> {
        self.table.load().select(code, attempt).cloned()
    }

    /// Add `node` with `weight`. Returns false if it was already present.
    pub fn add(&self, node: T, weight: u32) -> bool {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let current = self.table.load();
        if current.contains(&node) {
            return false;
        }

        let mut entries = current.entries.clone();
        entries.push(WeightedEntry::new(node, weight));
        self.table.store(Arc::new(NodeTable::from_entries(entries)));
        true
    }

    /// Remove `node`. Returns false if it was not present.
    pub fn remove(&self, node: &T) -> bool {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let current = self.table.load();
        if !current.contains(node) {
            return false;
        }

        let entries = current
            .entries
            .iter()
            .filter(|e| &e.node != node)
            .cloned()
            .collect();
        self.table.store(Arc::new(NodeTable::from_entries(entries)));
        true
    }

    /// Whether `node` is currently in rotation.
    pub fn contains(&self, node: &T) -> bool {
        self.table.load().contains(node)
    }

    /// Number of nodes currently in rotation.
    pub fn node_count(&self) -> usize {
        self.table.load().node_count()
    }
}
