//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::FailoverConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<FailoverConfig, ConfigError> {
    let config: FailoverConfig = toml::from_str(content)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<FailoverConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_config() {
        let config = parse_config(
            r#"
            [monitor]
            probe_interval_ms = 500

            [[nodes]]
            name = "a"
            address = "127.0.0.1:19100"
            weight = 50

            [[nodes]]
            name = "b"
            address = "127.0.0.1:19101"
            internal = true
            "#,
        )
        .unwrap();

        assert_eq!(config.monitor.probe_interval_ms, 500);
        assert_eq!(config.nodes[0].weight, 50);
        assert!(config.nodes[1].internal);
    }

    #[test]
    fn test_validation_errors_are_joined() {
        let err = parse_config(
            r#"
            [dispatch]
            default_timeout_ms = 0

            [[nodes]]
            name = "a"
            address = "x"
            weight = 0
            "#,
        )
        .unwrap_err();

        let text = err.to_string();
        assert!(text.starts_with("Validation failed: "));
        assert!(text.contains("dispatch.default_timeout_ms must be greater than zero"));
        assert!(text.contains("node 'a' has weight 0"));
    }

    #[test]
    fn test_parse_error() {
        assert!(matches!(parse_config("nodes = 7"), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_missing_file() {
        let err = load_config(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
