//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from TOML. Every section
//! has defaults so a minimal file (or none at all) is valid.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::resilience::CircuitBreakerConfig;

/// Root configuration for the reliability service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServiceConfig {
    /// Listener for the health and admin API.
    pub listener: ListenerConfig,

    /// Admin API settings.
    pub admin: AdminConfig,

    /// Health monitor settings and checks.
    pub health: HealthConfig,

    /// Circuit breakers, one per protected dependency.
    pub breakers: Vec<BreakerConfig>,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            request_timeout_secs: 30,
        }
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Mount the admin routes.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            // WARNING: This is a placeholder! Change this in production.
            api_key: "CHANGE_ME_IN_PRODUCTION".to_string(),
        }
    }
}

/// Health monitor configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HealthConfig {
    /// Run checks periodically in the background.
    pub poll_enabled: bool,

    /// Background polling interval in seconds.
    pub poll_interval_secs: u64,

    /// Timeout for checks that do not set their own, in milliseconds.
    pub default_timeout_ms: u64,

    /// Checks to register.
    pub checks: Vec<CheckConfig>,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            poll_enabled: true,
            poll_interval_secs: 30,
            default_timeout_ms: 5000,
            checks: Vec::new(),
        }
    }
}

/// How a configured check probes its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeKind {
    /// TCP connect to `host:port`.
    Tcp,
    /// HTTP GET expecting a 2xx.
    Http,
}

/// A single health check.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CheckConfig {
    /// Unique check name.
    pub name: String,

    pub kind: ProbeKind,

    /// `host:port` for tcp, URL for http.
    pub target: String,

    /// Overrides `health.default_timeout_ms`.
    #[serde(default)]
    pub timeout_ms: Option<u64>,

    /// A failing critical check marks the instance unhealthy.
    #[serde(default)]
    pub critical: bool,

    /// Name of a breaker to run the probe through.
    #[serde(default)]
    pub breaker: Option<String>,
}

/// Circuit breaker thresholds.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BreakerConfig {
    /// Unique breaker name.
    pub name: String,

    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,

    #[serde(default = "default_recovery_timeout_ms")]
    pub recovery_timeout_ms: u64,

    #[serde(default = "default_monitoring_window_ms")]
    pub monitoring_window_ms: u64,

    #[serde(default = "default_success_threshold")]
    pub success_threshold: u32,
}

fn default_failure_threshold() -> u32 {
    5
}

fn default_recovery_timeout_ms() -> u64 {
    30_000
}

fn default_monitoring_window_ms() -> u64 {
    60_000
}

fn default_success_threshold() -> u32 {
    3
}

impl From<&BreakerConfig> for CircuitBreakerConfig {
    fn from(config: &BreakerConfig) -> Self {
        Self {
            failure_threshold: config.failure_threshold,
            recovery_timeout: Duration::from_millis(config.recovery_timeout_ms),
            monitoring_window: Duration::from_millis(config.monitoring_window_ms),
            success_threshold: config.success_threshold,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config: ServiceConfig = toml::from_str("").unwrap();
        assert_eq!(config.listener.bind_address, "0.0.0.0:8080");
        assert_eq!(config.health.default_timeout_ms, 5000);
        assert!(config.breakers.is_empty());
        assert_eq!(config.observability.log_format, LogFormat::Pretty);
    }

    #[test]
    fn test_breaker_defaults_and_conversion() {
        let config: ServiceConfig = toml::from_str(
            r#"
            [[breakers]]
            name = "inference"
            failure_threshold = 2
            "#,
        )
        .unwrap();

        let breaker = CircuitBreakerConfig::from(&config.breakers[0]);
        assert_eq!(breaker.failure_threshold, 2);
        assert_eq!(breaker.recovery_timeout, Duration::from_secs(30));
        assert_eq!(breaker.monitoring_window, Duration::from_secs(60));
        assert_eq!(breaker.success_threshold, 3);
    }
}
