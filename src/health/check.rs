//! Health check definitions.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Error raised by a probe.
pub type ProbeError = Box<dyn std::error::Error + Send + Sync>;

/// Boxed future returned by a probe.
pub type ProbeFuture = Pin<Box<dyn Future<Output = Result<bool, ProbeError>> + Send>>;

type ProbeFn = Arc<dyn Fn() -> ProbeFuture + Send + Sync>;

/// Default per-check deadline.
pub const DEFAULT_CHECK_TIMEOUT: Duration = Duration::from_secs(5);

/// Why a check did not pass. Stored as text on the check result.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CheckError {
    /// The probe returned an error or panicked.
    #[error("{0}")]
    ProbeFailure(String),

    /// The probe did not settle within its deadline.
    #[error("health check timed out after {0}ms")]
    ProbeTimeout(u64),
}

/// A named liveness probe with a deadline.
///
/// Definitions are immutable once built and cheap to clone.
#[derive(Clone)]
pub struct HealthCheck {
    name: String,
    probe: ProbeFn,
    timeout: Duration,
    critical: bool,
}

impl HealthCheck {
    /// Create a non-critical check with the default timeout.
    pub fn new<F, Fut>(name: impl Into<String>, probe: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<bool, ProbeError>> + Send + 'static,
    {
        Self {
            name: name.into(),
            probe: Arc::new(move || Box::pin(probe()) as ProbeFuture),
            timeout: DEFAULT_CHECK_TIMEOUT,
            critical: false,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// A failing critical check marks the whole system unhealthy.
    pub fn critical(mut self, critical: bool) -> Self {
        self.critical = critical;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn is_critical(&self) -> bool {
        self.critical
    }

    /// Start one probe invocation.
    pub fn probe(&self) -> ProbeFuture {
        (self.probe)()
    }
}

impl fmt::Debug for HealthCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HealthCheck")
            .field("name", &self.name)
            .field("timeout", &self.timeout)
            .field("critical", &self.critical)
            .finish_non_exhaustive()
    }
}
