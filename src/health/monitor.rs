//! Composite health monitoring.
//!
//! # Responsibilities
//! - Run every registered check against its own deadline
//! - Snapshot registered circuit breakers once checks resolve
//! - Derive one overall status and report it

use futures_util::future::join_all;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::{self, Instant};

use crate::health::check::{CheckError, HealthCheck};
use crate::health::report::{BreakerSnapshot, CheckResult, CheckStatus, OverallStatus, SystemHealth};
use crate::observability::metrics;
use crate::resilience::timeouts::{run_with_deadline, DeadlineError};
use crate::resilience::{CircuitBreaker, CircuitState};

/// Runs registered health checks and reports on registered breakers.
///
/// Breakers are held weakly: the monitor only reads them, and a breaker whose
/// owner has dropped it disappears from reports.
#[derive(Debug, Default)]
pub struct HealthMonitor {
    checks: Vec<HealthCheck>,
    breakers: Vec<(String, Weak<CircuitBreaker>)>,
}

impl HealthMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a check. A check with the same name is replaced in place.
    pub fn add_check(&mut self, check: HealthCheck) {
        match self.checks.iter_mut().find(|c| c.name() == check.name()) {
            Some(existing) => *existing = check,
            None => self.checks.push(check),
        }
    }

    /// Register a breaker for reporting. The same name is replaced in place.
    pub fn add_circuit_breaker(&mut self, name: impl Into<String>, breaker: &Arc<CircuitBreaker>) {
        let name = name.into();
        let weak = Arc::downgrade(breaker);
        match self.breakers.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => *existing = weak,
            None => self.breakers.push((name, weak)),
        }
    }

    pub fn check_names(&self) -> Vec<&str> {
        self.checks.iter().map(|c| c.name()).collect()
    }

    /// Look up a registered breaker that is still alive.
    pub fn circuit_breaker(&self, name: &str) -> Option<Arc<CircuitBreaker>> {
        self.breakers
            .iter()
            .find(|(n, _)| n == name)
            .and_then(|(_, weak)| weak.upgrade())
    }

    /// Run all checks, snapshot breakers, and derive the overall status.
    ///
    /// Never fails: probe errors, panics and timeouts are recorded as failed
    /// checks. Checks run concurrently; results keep registration order.
    pub async fn run_health_checks(&self) -> SystemHealth {
        let results = join_all(self.checks.iter().map(run_check)).await;

        let checks: Vec<(String, CheckResult)> = self
            .checks
            .iter()
            .map(|c| c.name().to_string())
            .zip(results)
            .collect();

        let circuit_breakers = self.snapshot_breakers();

        let critical_failed = self
            .checks
            .iter()
            .zip(&checks)
            .any(|(check, (_, result))| check.is_critical() && !result.passed());

        let status = derive_status(
            critical_failed,
            checks.iter().any(|(_, r)| !r.passed()),
            circuit_breakers
                .iter()
                .any(|(_, s)| s.state == CircuitState::Open),
        );

        let report = SystemHealth {
            status,
            timestamp: chrono::Utc::now(),
            checks,
            circuit_breakers,
        };

        log_report(&report);
        metrics::record_system_status(status);
        report
    }

    /// Poll `run_health_checks` on a fixed interval until shutdown.
    pub async fn run(self: Arc<Self>, interval: Duration, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(
            interval_secs = interval.as_secs(),
            checks = self.checks.len(),
            breakers = self.breakers.len(),
            "Health monitor starting"
        );

        let mut ticker = time::interval(interval);
        ticker.set_missed_tick_behavior(time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let report = self.run_health_checks().await;
                    tracing::debug!(status = %report.status, "Periodic health check complete");
                }
                _ = shutdown.recv() => {
                    tracing::info!("Health monitor received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    fn snapshot_breakers(&self) -> Vec<(String, BreakerSnapshot)> {
        self.breakers
            .iter()
            .filter_map(|(name, weak)| {
                let Some(breaker) = weak.upgrade() else {
                    tracing::debug!(breaker = %name, "Registered breaker dropped, skipping");
                    return None;
                };
                let stats = breaker.stats();
                Some((
                    name.clone(),
                    BreakerSnapshot {
                        state: stats.state,
                        failures: stats.failures,
                    },
                ))
            })
            .collect()
    }
}

/// Status rules: a critical failure condemns; any other failure or an open
/// breaker degrades.
pub fn derive_status(critical_failed: bool, any_failed: bool, any_open: bool) -> OverallStatus {
    if critical_failed {
        OverallStatus::Unhealthy
    } else if any_failed || any_open {
        OverallStatus::Degraded
    } else {
        OverallStatus::Healthy
    }
}

async fn run_check(check: &HealthCheck) -> CheckResult {
    let start = Instant::now();
    let outcome = run_with_deadline(check.timeout(), check.probe()).await;
    let elapsed = start.elapsed();
    let response_time_ms = elapsed.as_millis() as u64;

    let (status, error) = match outcome {
        Ok(Ok(true)) => (CheckStatus::Pass, None),
        Ok(Ok(false)) => (CheckStatus::Fail, None),
        Ok(Err(e)) => (CheckStatus::Fail, Some(CheckError::ProbeFailure(e.to_string()))),
        Err(DeadlineError::Elapsed(limit)) => (
            CheckStatus::Fail,
            Some(CheckError::ProbeTimeout(limit.as_millis() as u64)),
        ),
        Err(DeadlineError::Join(e)) => (
            CheckStatus::Fail,
            Some(CheckError::ProbeFailure(format!("probe panicked: {}", e))),
        ),
    };

    tracing::debug!(
        check = %check.name(),
        passed = status == CheckStatus::Pass,
        response_time_ms,
        error = ?error,
        "Health check finished"
    );
    metrics::record_health_check(check.name(), status == CheckStatus::Pass, elapsed);

    CheckResult {
        status,
        response_time_ms,
        error: error.map(|e| e.to_string()),
    }
}

fn log_report(report: &SystemHealth) {
    let failed_checks = report.failed_checks();
    let open_breakers = report.open_breakers();

    match report.status {
        OverallStatus::Healthy => {}
        OverallStatus::Degraded => tracing::warn!(
            status = %report.status,
            ?failed_checks,
            ?open_breakers,
            "System health degraded"
        ),
        OverallStatus::Unhealthy => tracing::error!(
            status = %report.status,
            ?failed_checks,
            ?open_breakers,
            "System unhealthy"
        ),
    }
}
