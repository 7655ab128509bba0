//! Metrics collection and exposition.
//!
//! # Metrics
//! - `reliability_breaker_state` (gauge): 0=closed, 1=open, 2=half-open
//! - `reliability_breaker_transitions_total` (counter): by breaker, from, to
//! - `reliability_breaker_rejections_total` (counter): calls refused while open
//! - `reliability_health_check_duration_seconds` (histogram): by check
//! - `reliability_health_check_failures_total` (counter): by check
//! - `reliability_system_status` (gauge): 0=healthy, 1=degraded, 2=unhealthy
//!
//! Recording without an installed exporter is a no-op.

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Duration;

use crate::health::report::OverallStatus;
use crate::resilience::CircuitState;

/// Start the Prometheus scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_breaker_state(breaker: &str, state: CircuitState) {
    ::metrics::gauge!("reliability_breaker_state", "breaker" => breaker.to_string())
        .set(state.as_gauge());
}

pub fn record_breaker_transition(breaker: &str, from: CircuitState, to: CircuitState) {
    ::metrics::counter!(
        "reliability_breaker_transitions_total",
        "breaker" => breaker.to_string(),
        "from" => from.as_str(),
        "to" => to.as_str()
    )
    .increment(1);
}

pub fn record_breaker_rejection(breaker: &str) {
    ::metrics::counter!("reliability_breaker_rejections_total", "breaker" => breaker.to_string())
        .increment(1);
}

pub fn record_health_check(check: &str, passed: bool, elapsed: Duration) {
    ::metrics::histogram!(
        "reliability_health_check_duration_seconds",
        "check" => check.to_string()
    )
    .record(elapsed.as_secs_f64());

    if !passed {
        ::metrics::counter!("reliability_health_check_failures_total", "check" => check.to_string())
            .increment(1);
    }
}

pub fn record_system_status(status: OverallStatus) {
    let value = match status {
        OverallStatus::Healthy => 0.0,
        OverallStatus::Degraded => 1.0,
        OverallStatus::Unhealthy => 2.0,
    };
    ::metrics::gauge!("reliability_system_status").set(value);
}
