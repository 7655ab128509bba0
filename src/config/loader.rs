//! Configuration loading from disk.

use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::config::schema::ServiceConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<ServiceConfig, ConfigError> {
    let config: ServiceConfig = toml::from_str(content)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<ServiceConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::ProbeKind;

    const SAMPLE: &str = r#"
        [listener]
        bind_address = "127.0.0.1:9000"

        [admin]
        enabled = true
        api_key = "secret"

        [health]
        poll_interval_secs = 10

        [[health.checks]]
        name = "database"
        kind = "tcp"
        target = "127.0.0.1:5432"
        critical = true
        breaker = "database"

        [[health.checks]]
        name = "search"
        kind = "http"
        target = "http://127.0.0.1:7700/health"
        timeout_ms = 1500

        [[breakers]]
        name = "database"
        failure_threshold = 3
        recovery_timeout_ms = 10000
    "#;

    #[test]
    fn test_parse_sample() {
        let config = parse_config(SAMPLE).unwrap();
        assert_eq!(config.listener.bind_address, "127.0.0.1:9000");
        assert!(config.admin.enabled);
        assert_eq!(config.health.checks.len(), 2);
        assert_eq!(config.health.checks[0].kind, ProbeKind::Tcp);
        assert_eq!(config.health.checks[0].breaker.as_deref(), Some("database"));
        assert_eq!(config.health.checks[1].timeout_ms, Some(1500));
        assert!(!config.health.checks[1].critical);
        assert_eq!(config.breakers[0].failure_threshold, 3);
    }

    #[test]
    fn test_parse_error() {
        let err = parse_config("[listener\nbind_address = 1").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_validation_error_lists_all_problems() {
        let err = parse_config(
            r#"
            [[breakers]]
            name = "db"
            failure_threshold = 0
            success_threshold = 0
            "#,
        )
        .unwrap_err();

        match &err {
            ConfigError::Validation(errors) => assert_eq!(errors.len(), 2),
            other => panic!("unexpected error: {}", other),
        }
        assert!(err.to_string().starts_with("Validation failed: "));
    }

    #[test]
    fn test_missing_file() {
        let err = load_config(Path::new("/nonexistent/reliability.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
