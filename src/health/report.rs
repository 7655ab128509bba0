//! System health report types.
//!
//! `SystemHealth` is the externally visible contract. It serializes to a flat
//! JSON object; `status` is the field load balancers and uptime checks key on.

use chrono::{DateTime, Utc};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::fmt;

use crate::resilience::CircuitState;

/// Overall status of this instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OverallStatus {
    /// Serve traffic normally.
    Healthy,
    /// Serve traffic, but operators should look.
    Degraded,
    /// Stop routing to this instance.
    Unhealthy,
}

impl OverallStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            OverallStatus::Healthy => "healthy",
            OverallStatus::Degraded => "degraded",
            OverallStatus::Unhealthy => "unhealthy",
        }
    }
}

impl fmt::Display for OverallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Pass,
    Fail,
}

/// Outcome of one health check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckResult {
    pub status: CheckStatus,
    pub response_time_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CheckResult {
    pub fn passed(&self) -> bool {
        self.status == CheckStatus::Pass
    }
}

/// Breaker state as seen by one health run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BreakerSnapshot {
    pub state: CircuitState,
    pub failures: usize,
}

/// Aggregated health of this instance.
#[derive(Debug, Clone, Serialize)]
pub struct SystemHealth {
    pub status: OverallStatus,
    pub timestamp: DateTime<Utc>,
    /// Per-check results in registration order.
    #[serde(serialize_with = "ordered_map")]
    pub checks: Vec<(String, CheckResult)>,
    #[serde(serialize_with = "ordered_map")]
    pub circuit_breakers: Vec<(String, BreakerSnapshot)>,
}

impl SystemHealth {
    pub fn check(&self, name: &str) -> Option<&CheckResult> {
        self.checks.iter().find(|(n, _)| n == name).map(|(_, r)| r)
    }

    pub fn breaker(&self, name: &str) -> Option<&BreakerSnapshot> {
        self.circuit_breakers
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, s)| s)
    }

    pub fn failed_checks(&self) -> Vec<&str> {
        self.checks
            .iter()
            .filter(|(_, r)| !r.passed())
            .map(|(n, _)| n.as_str())
            .collect()
    }

    pub fn open_breakers(&self) -> Vec<&str> {
        self.circuit_breakers
            .iter()
            .filter(|(_, s)| s.state == CircuitState::Open)
            .map(|(n, _)| n.as_str())
            .collect()
    }
}

/// Serialize `(key, value)` pairs as a JSON object, keeping their order.
#[allow(clippy::ptr_arg)]
fn ordered_map<S, V>(entries: &Vec<(String, V)>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
    V: Serialize,
{
    let mut map = serializer.serialize_map(Some(entries.len()))?;
    for (key, value) in entries {
        map.serialize_entry(key, value)?;
    }
    map.end()
}
