//! Configuration validation.
//!
//! Semantic checks that serde cannot express. Validation is a pure function
//! and reports every problem, not just the first.

use std::collections::HashSet;
use thiserror::Error;

use crate::config::schema::{ProbeKind, ServiceConfig};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} must be greater than zero")]
    Zero { field: String },

    #[error("{field} must not be empty")]
    Empty { field: String },

    #[error("duplicate {kind} name '{name}'")]
    Duplicate { kind: &'static str, name: String },

    #[error("check '{check}' references unknown breaker '{breaker}'")]
    UnknownBreaker { check: String, breaker: String },

    #[error("check '{check}' has invalid target '{target}': {reason}")]
    InvalidTarget {
        check: String,
        target: String,
        reason: String,
    },
}

fn zero(field: String) -> ValidationError {
    ValidationError::Zero { field }
}

pub fn validate_config(config: &ServiceConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.request_timeout_secs == 0 {
        errors.push(zero("listener.request_timeout_secs".into()));
    }
    if config.health.poll_interval_secs == 0 {
        errors.push(zero("health.poll_interval_secs".into()));
    }
    if config.health.default_timeout_ms == 0 {
        errors.push(zero("health.default_timeout_ms".into()));
    }

    if config.admin.enabled && config.admin.api_key.trim().is_empty() {
        errors.push(ValidationError::Empty {
            field: "admin.api_key".into(),
        });
    }

    let mut breaker_names = HashSet::new();
    for breaker in &config.breakers {
        if !breaker_names.insert(breaker.name.as_str()) {
            errors.push(ValidationError::Duplicate {
                kind: "breaker",
                name: breaker.name.clone(),
            });
        }
        let prefix = format!("breakers.{}", breaker.name);
        if breaker.failure_threshold == 0 {
            errors.push(zero(format!("{}.failure_threshold", prefix)));
        }
        if breaker.success_threshold == 0 {
            errors.push(zero(format!("{}.success_threshold", prefix)));
        }
        if breaker.recovery_timeout_ms == 0 {
            errors.push(zero(format!("{}.recovery_timeout_ms", prefix)));
        }
        if breaker.monitoring_window_ms == 0 {
            errors.push(zero(format!("{}.monitoring_window_ms", prefix)));
        }
    }

    let mut check_names = HashSet::new();
    for check in &config.health.checks {
        if !check_names.insert(check.name.as_str()) {
            errors.push(ValidationError::Duplicate {
                kind: "check",
                name: check.name.clone(),
            });
        }
        if check.timeout_ms == Some(0) {
            errors.push(zero(format!("health.checks.{}.timeout_ms", check.name)));
        }
        if let Some(breaker) = &check.breaker {
            if !breaker_names.contains(breaker.as_str()) {
                errors.push(ValidationError::UnknownBreaker {
                    check: check.name.clone(),
                    breaker: breaker.clone(),
                });
            }
        }
        if let Err(reason) = validate_target(check.kind, &check.target) {
            errors.push(ValidationError::InvalidTarget {
                check: check.name.clone(),
                target: check.target.clone(),
                reason,
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_target(kind: ProbeKind, target: &str) -> Result<(), String> {
    match kind {
        ProbeKind::Tcp => {
            let (host, port) = target
                .rsplit_once(':')
                .ok_or_else(|| "expected host:port".to_string())?;
            if host.is_empty() {
                return Err("missing host".to_string());
            }
            port.parse::<u16>()
                .map(|_| ())
                .map_err(|_| format!("invalid port '{}'", port))
        }
        ProbeKind::Http => {
            let url = reqwest::Url::parse(target).map_err(|e| e.to_string())?;
            match url.scheme() {
                "http" | "https" => Ok(()),
                other => Err(format!("unsupported scheme '{}'", other)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{BreakerConfig, CheckConfig};

    fn breaker(name: &str) -> BreakerConfig {
        BreakerConfig {
            name: name.to_string(),
            failure_threshold: 5,
            recovery_timeout_ms: 30_000,
            monitoring_window_ms: 60_000,
            success_threshold: 2,
        }
    }

    fn check(name: &str, kind: ProbeKind, target: &str) -> CheckConfig {
        CheckConfig {
            name: name.to_string(),
            kind,
            target: target.to_string(),
            timeout_ms: None,
            critical: false,
            breaker: None,
        }
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&ServiceConfig::default()).is_ok());
    }

    #[test]
    fn test_duplicates_and_unknown_breaker() {
        let mut config = ServiceConfig::default();
        config.breakers = vec![breaker("db"), breaker("db")];
        let mut c = check("db", ProbeKind::Tcp, "localhost:5432");
        c.breaker = Some("cache".into());
        config.health.checks = vec![c.clone(), check("db", ProbeKind::Tcp, "localhost:5432")];

        let errors = validate_config(&config).unwrap_err();
        assert!(errors.contains(&ValidationError::Duplicate {
            kind: "breaker",
            name: "db".into()
        }));
        assert!(errors.contains(&ValidationError::Duplicate {
            kind: "check",
            name: "db".into()
        }));
        assert!(errors.contains(&ValidationError::UnknownBreaker {
            check: "db".into(),
            breaker: "cache".into()
        }));
    }

    #[test]
    fn test_targets() {
        assert!(validate_target(ProbeKind::Tcp, "127.0.0.1:6379").is_ok());
        assert!(validate_target(ProbeKind::Tcp, "redis").is_err());
        assert!(validate_target(ProbeKind::Tcp, "redis:http").is_err());
        assert!(validate_target(ProbeKind::Http, "https://search.internal/health").is_ok());
        assert!(validate_target(ProbeKind::Http, "ftp://files").is_err());
        assert!(validate_target(ProbeKind::Http, "not a url").is_err());
    }

    #[test]
    fn test_zero_durations() {
        let mut config = ServiceConfig::default();
        config.health.poll_interval_secs = 0;
        let mut b = breaker("ai");
        b.monitoring_window_ms = 0;
        config.breakers.push(b);

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert_eq!(
            errors[1].to_string(),
            "breakers.ai.monitoring_window_ms must be greater than zero"
        );
    }

    #[test]
    fn test_enabled_admin_requires_api_key() {
        let mut config = ServiceConfig::default();
        config.admin.api_key = String::new();
        assert!(validate_config(&config).is_ok());

        config.admin.enabled = true;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![ValidationError::Empty {
                field: "admin.api_key".into()
            }]
        );
        assert_eq!(errors[0].to_string(), "admin.api_key must not be empty");

        config.admin.api_key = "  ".into();
        assert!(validate_config(&config).is_err());
    }
}
