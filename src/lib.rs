//! Failover dispatch over a pool of homogeneous nodes.

pub mod admin;
pub mod cluster;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod health;
pub mod lifecycle;
pub mod load_balancer;
pub mod net;
pub mod observability;

pub use cluster::{ClusterNode, FailoverCluster};
pub use config::FailoverConfig;
pub use dispatch::{Dispatcher, ErrorSink};
pub use error::{DispatchError, DispatchResult, ErrorKind, NodeError};
pub use health::{Eligibility, HealthMonitor, HealthReporter};
pub use lifecycle::Shutdown;
pub use load_balancer::{ManagedPool, Node, PoolOwner, Prober, WeightedSelector};
