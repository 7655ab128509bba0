//! Startup wiring.
//!
//! Builds the breakers and the health monitor from validated configuration.
//! Breakers are owned here (and by whoever clones them out); the monitor
//! only holds weak references.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{CheckConfig, ProbeKind, ServiceConfig};
use crate::health::{HealthCheck, HealthMonitor, HttpPing, Pingable, TcpPing};
use crate::resilience::{CircuitBreaker, CircuitBreakerConfig};

/// Breakers by name.
pub type BreakerMap = BTreeMap<String, Arc<CircuitBreaker>>;

/// Everything the server needs, built once at startup.
pub struct Services {
    pub breakers: Arc<BreakerMap>,
    pub monitor: Arc<HealthMonitor>,
}

impl Services {
    pub fn from_config(config: &ServiceConfig) -> Self {
        let breakers = build_breakers(config);
        let monitor = build_monitor(config, &breakers);

        tracing::info!(
            breakers = breakers.len(),
            checks = config.health.checks.len(),
            "Reliability services initialized"
        );

        Self {
            breakers: Arc::new(breakers),
            monitor: Arc::new(monitor),
        }
    }
}

pub fn build_breakers(config: &ServiceConfig) -> BreakerMap {
    config
        .breakers
        .iter()
        .map(|b| {
            let breaker = CircuitBreaker::new(b.name.clone(), CircuitBreakerConfig::from(b));
            (b.name.clone(), Arc::new(breaker))
        })
        .collect()
}

pub fn build_monitor(config: &ServiceConfig, breakers: &BreakerMap) -> HealthMonitor {
    let mut monitor = HealthMonitor::new();
    let default_timeout = Duration::from_millis(config.health.default_timeout_ms);

    for check in &config.health.checks {
        monitor.add_check(build_check(check, default_timeout, breakers));
    }
    for (name, breaker) in breakers {
        monitor.add_circuit_breaker(name.clone(), breaker);
    }
    monitor
}

fn build_check(config: &CheckConfig, default_timeout: Duration, breakers: &BreakerMap) -> HealthCheck {
    let target: Arc<dyn Pingable> = match config.kind {
        ProbeKind::Tcp => Arc::new(TcpPing::new(config.target.clone())),
        ProbeKind::Http => Arc::new(HttpPing::new(config.target.clone())),
    };

    let timeout = config
        .timeout_ms
        .map(Duration::from_millis)
        .unwrap_or(default_timeout);

    let breaker = config.breaker.as_ref().and_then(|name| breakers.get(name));
    let check = match breaker {
        Some(breaker) => {
            HealthCheck::guarded(config.name.clone(), target, breaker.clone(), timeout)
        }
        None => HealthCheck::from_pingable(config.name.clone(), target).with_timeout(timeout),
    };

    check.critical(config.critical)
}
