//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files.
//! Durations are stored as milliseconds and exposed as `Duration`.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::load_balancer::node::DEFAULT_WEIGHT;

/// Root configuration for a failover cluster.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct FailoverConfig {
    /// Health monitor settings.
    pub monitor: MonitorConfig,

    /// Request dispatch settings.
    pub dispatch: DispatchConfig,

    /// Backend node definitions.
    pub nodes: Vec<NodeConfig>,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Admin endpoint settings.
    pub admin: AdminConfig,
}

/// Health monitor configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Run the background prober.
    pub enabled: bool,

    /// Time between probe sweeps.
    pub probe_interval_ms: u64,

    /// How long to wait for one probe before counting it as no answer.
    pub probe_deadline_ms: u64,

    /// Timeout handed to the prober, to advertise to the remote peer.
    pub probe_request_timeout_ms: u64,

    /// How long a node may go without success before a missed probe
    /// takes it out of rotation.
    pub fail_limit_ms: u64,

    /// How long shutdown waits for in-flight probes.
    pub shutdown_grace_ms: u64,

    /// Upper bound on probes in flight at once.
    pub max_concurrent_probes: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            probe_interval_ms: 1000,
            probe_deadline_ms: 980,
            probe_request_timeout_ms: 980,
            fail_limit_ms: 5000,
            shutdown_grace_ms: 1000,
            max_concurrent_probes: 64,
        }
    }
}

impl MonitorConfig {
    pub fn probe_interval(&self) -> Duration {
        Duration::from_millis(self.probe_interval_ms)
    }

    pub fn probe_deadline(&self) -> Duration {
        Duration::from_millis(self.probe_deadline_ms)
    }

    pub fn probe_request_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_request_timeout_ms)
    }

    pub fn fail_limit(&self) -> Duration {
        Duration::from_millis(self.fail_limit_ms)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }
}

/// Request dispatch configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Deadline applied when the caller does not supply one.
    pub default_timeout_ms: u64,

    /// Report per-attempt outcomes to the health monitor.
    pub report_outcomes: bool,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            default_timeout_ms: 5000,
            report_outcomes: true,
        }
    }
}

impl DispatchConfig {
    pub fn default_timeout(&self) -> Duration {
        Duration::from_millis(self.default_timeout_ms)
    }
}

/// Backend node configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NodeConfig {
    /// Unique node identifier.
    pub name: String,

    /// Node address (e.g., "10.0.0.7:19100").
    pub address: String,

    /// Relative load share (default: 100).
    #[serde(default = "default_weight")]
    pub weight: u32,

    /// Whether the node is local to this cluster. Diagnostic only.
    #[serde(default)]
    pub internal: bool,
}

fn default_weight() -> u32 {
    DEFAULT_WEIGHT
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Admin endpoint configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Serve the diagnostics endpoint.
    pub enabled: bool,

    /// Admin bind address.
    pub bind_address: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bind_address: "127.0.0.1:8081".to_string(),
        }
    }
}
