//! Health monitoring subsystem.
//!
//! # Data Flow
//! ```text
//! run_health_checks (monitor.rs):
//!     For each registered check (check.rs), concurrently:
//!         → spawn probe, race its deadline
//!         → pass / fail + response time
//!     Then, once all checks resolve:
//!         → snapshot registered circuit breakers
//!         → derive overall status
//!         → SystemHealth (report.rs)
//!
//! Default checks (probes.rs):
//!     Dependencies { database, cache, ... } → Pingable → HealthCheck
//! ```
//!
//! # Design Decisions
//! - Only a critical check failure makes the system unhealthy
//! - Open breakers and non-critical failures degrade
//! - Reports are produced fresh on every run and never cached

pub mod check;
pub mod monitor;
pub mod probes;
pub mod report;

pub use check::{CheckError, HealthCheck, ProbeError};
pub use monitor::HealthMonitor;
pub use probes::{Dependencies, HttpPing, Pingable, TcpPing};
pub use report::{BreakerSnapshot, CheckResult, CheckStatus, OverallStatus, SystemHealth};
