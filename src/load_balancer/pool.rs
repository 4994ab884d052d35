//! Node pool management.
//!
//! # Responsibilities
//! - Define the contract between the health monitor and the component that
//!   owns the selector (`PoolOwner`)
//! - Provide a ready-made owner that keeps a `WeightedSelector` in sync with
//!   health transitions and delegates probing to a `Prober`

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::error::NodeError;
use crate::load_balancer::node::Node;
use crate::load_balancer::selector::WeightedSelector;

/// Receives health transitions from the monitor and performs probes for it.
///
/// `working` and `failed` may be called more often than strictly necessary
/// when the probe loop and the request path observe the same transition, so
/// both must be idempotent.
#[async_trait]
pub trait PoolOwner<T: Node>: Send + Sync + 'static {
    /// A node that was not known to be working now is.
    fn working(&self, node: &T);

    /// A node that was not known to be failed now is.
    fn failed(&self, node: &T);

    /// Run one health check against `node`.
    ///
    /// `request_timeout` is the time the remote peer should be told it has.
    /// The monitor enforces its own, separate deadline on this call.
    async fn probe(&self, node: &T, request_timeout: Duration) -> Result<(), NodeError>;

    /// Called after every probe of a sweep has been issued.
    fn sweep_completed(&self) {}
}

/// A pluggable health check.
#[async_trait]
pub trait Prober<T: Node>: Send + Sync + 'static {
    async fn probe(&self, node: &T, request_timeout: Duration) -> Result<(), NodeError>;
}

#[async_trait]
impl<T: Node, P: Prober<T> + ?Sized> Prober<T> for Arc<P> {
    async fn probe(&self, node: &T, request_timeout: Duration) -> Result<(), NodeError> {
        (**self).probe(node, request_timeout).await
    }
}

/// A `PoolOwner` that maps health transitions onto selector membership.
#[derive(Debug)]
pub struct ManagedPool<T: Node, P> {
    selector: Arc<WeightedSelector<T>>,
    weights: DashMap<T, u32>,
    prober: P,
}

impl<T: Node, P: Prober<T>> ManagedPool<T, P> {
    /// Create a pool that manages `selector`.
    pub fn new(selector: Arc<WeightedSelector<T>>, prober: P) -> Self {
        Self {
            selector,
            weights: DashMap::new(),
            prober,
        }
    }

    /// Take `node` under management and put it into rotation.
    ///
    /// Returns false if the node was already managed.
    pub fn add_node(&self, node: T, weight: u32) -> bool {
        match self.weights.entry(node.clone()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(weight);
                self.selector.add(node, weight);
                true
            }
        }
    }

    /// Stop managing `node` and take it out of rotation.
    pub fn remove_node(&self, node: &T) -> bool {
        // The entry stays locked until the selector no longer has the node,
        // so a concurrent `working` cannot put it back.
        match self.weights.entry(node.clone()) {
            Entry::Occupied(slot) => {
                self.selector.remove(node);
                slot.remove();
                true
            }
            Entry::Vacant(_) => {
                self.selector.remove(node);
                false
            }
        }
    }

    /// Configured weight of a managed node.
    pub fn weight(&self, node: &T) -> Option<u32> {
        self.weights.get(node).map(|w| *w)
    }

    /// Every managed node with its configured weight.
    pub fn managed(&self) -> Vec<(T, u32)> {
        self.weights
            .iter()
            .map(|e| (e.key().clone(), *e.value()))
            .collect()
    }

    pub fn selector(&self) -> &Arc<WeightedSelector<T>> {
        &self.selector
    }
}

#[async_trait]
impl<T: Node, P: Prober<T>> PoolOwner<T> for ManagedPool<T, P> {
    fn working(&self, node: &T) {
        // Held across the add; see `remove_node`.
        let Some(managed) = self.weights.get(node) else {
            tracing::debug!(node = %node, "Ignoring recovery of unmanaged node");
            return;
        };
        let weight = *managed.value();
        if self.selector.add(node.clone(), weight) {
            tracing::info!(node = %node, weight, rotation = self.selector.node_count(), "Node returned to rotation");
        }
    }

    fn failed(&self, node: &T) {
        if self.selector.remove(node) {
            tracing::warn!(node = %node, rotation = self.selector.node_count(), "Node removed from rotation");
        }
    }

    async fn probe(&self, node: &T, request_timeout: Duration) -> Result<(), NodeError> {
        self.prober.probe(node, request_timeout).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct AlwaysUp;

    #[async_trait]
    impl Prober<&'static str> for AlwaysUp {
        async fn probe(&self, _node: &&'static str, _timeout: Duration) -> Result<(), NodeError> {
            Ok(())
        }
    }

    fn pool() -> ManagedPool<&'static str, AlwaysUp> {
        ManagedPool::new(Arc::new(WeightedSelector::new()), AlwaysUp)
    }

    #[test]
    fn test_failed_and_working_are_idempotent() {
        let pool = pool();
        pool.add_node("a", 100);
        pool.add_node("b", 300);

        pool.failed(&"b");
        pool.failed(&"b");
        assert_eq!(pool.selector().node_count(), 1);

        pool.working(&"b");
        pool.working(&"b");
        let table = pool.selector().snapshot();
        assert_eq!(table.node_count(), 2);
        assert_eq!(table.total_weight(), 400);
    }

    #[test]
    fn test_unmanaged_node_is_not_readded() {
        let pool = pool();
        pool.add_node("a", 100);
        assert!(pool.remove_node(&"a"));

        pool.working(&"a");
        assert!(!pool.selector().contains(&"a"));
        assert!(!pool.remove_node(&"a"));
    }

    #[test]
    fn test_removed_node_stays_out_under_concurrent_recovery() {
        use std::sync::Barrier;
        use std::thread;

        for _ in 0..200 {
            let pool = pool();
            pool.add_node("a", 100);
            pool.add_node("b", 100);
            pool.failed(&"a");

            let start = Barrier::new(3);
            thread::scope(|scope| {
                for _ in 0..2 {
                    scope.spawn(|| {
                        start.wait();
                        for _ in 0..50 {
                            pool.working(&"a");
                        }
                    });
                }
                scope.spawn(|| {
                    start.wait();
                    assert!(pool.remove_node(&"a"));
                });
            });

            assert!(!pool.selector().contains(&"a"));
            assert_eq!(pool.weight(&"a"), None);
            assert_eq!(pool.selector().node_count(), 1);
        }
    }

    #[test]
    fn test_add_node_once() {
        let pool = pool();
        assert!(pool.add_node("a", 100));
        assert!(!pool.add_node("a", 5));
        assert_eq!(pool.weight(&"a"), Some(100));
        assert_eq!(pool.managed(), vec![("a", 100)]);
    }

    #[tokio::test]
    async fn test_probe_delegates() {
        let pool = pool();
        assert!(PoolOwner::probe(&pool, &"a", Duration::from_millis(10)).await.is_ok());
    }
}
