//! Configuration validation.
//!
//! Serde handles syntax; this module checks value ranges and node identity.
//! Every problem is reported, not just the first.

use std::collections::HashSet;

use thiserror::Error;

use crate::config::schema::FailoverConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} must be greater than zero")]
    ZeroValue { field: &'static str },

    #[error("node #{index} has an empty name")]
    EmptyNodeName { index: usize },

    #[error("node '{name}' has an empty address")]
    EmptyNodeAddress { name: String },

    #[error("node '{name}' has weight 0")]
    ZeroWeight { name: String },

    #[error("node name '{name}' is used more than once")]
    DuplicateNode { name: String },
}

/// Validate `config`, returning every problem found.
pub fn validate_config(config: &FailoverConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let monitor = &config.monitor;
    let durations = [
        ("monitor.probe_interval_ms", monitor.probe_interval_ms),
        ("monitor.probe_deadline_ms", monitor.probe_deadline_ms),
        ("monitor.probe_request_timeout_ms", monitor.probe_request_timeout_ms),
        ("monitor.fail_limit_ms", monitor.fail_limit_ms),
        ("dispatch.default_timeout_ms", config.dispatch.default_timeout_ms),
    ];
    for (field, value) in durations {
        if value == 0 {
            errors.push(ValidationError::ZeroValue { field });
        }
    }
    if monitor.max_concurrent_probes == 0 {
        errors.push(ValidationError::ZeroValue {
            field: "monitor.max_concurrent_probes",
        });
    }

    let mut seen = HashSet::new();
    for (index, node) in config.nodes.iter().enumerate() {
        if node.name.trim().is_empty() {
            errors.push(ValidationError::EmptyNodeName { index });
            continue;
        }
        if node.address.trim().is_empty() {
            errors.push(ValidationError::EmptyNodeAddress {
                name: node.name.clone(),
            });
        }
        if node.weight == 0 {
            errors.push(ValidationError::ZeroWeight {
                name: node.name.clone(),
            });
        }
        if !seen.insert(node.name.as_str()) {
            errors.push(ValidationError::DuplicateNode {
                name: node.name.clone(),
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
