//! Probe capabilities for concrete dependencies.
//!
//! # Responsibilities
//! - Define the single-method capability a dependency exposes for health checks
//! - Provide TCP and HTTP reachability probes
//! - Build the default check battery from injected dependencies
//!
//! # Design Decisions
//! - The monitor only sees `HealthCheck`; dependency shapes stay here
//! - Store and database checks are critical, inference and vector search are not
//! - A probe may run through a circuit breaker so an open circuit fails fast

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;

use crate::health::check::{CheckError, HealthCheck, ProbeError};
use crate::health::monitor::HealthMonitor;
use crate::resilience::{CircuitBreaker, CircuitBreakerError};

/// Slack between a guarded ping's deadline and its check's deadline.
pub const GUARD_GRACE: Duration = Duration::from_millis(50);

/// A dependency that can answer "are you up?".
#[async_trait]
pub trait Pingable: Send + Sync {
    /// `Ok(true)` when reachable and serving.
    async fn ping(&self) -> Result<bool, ProbeError>;
}

/// Reachability by TCP connect.
#[derive(Debug, Clone)]
pub struct TcpPing {
    address: String,
}

impl TcpPing {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
        }
    }
}

#[async_trait]
impl Pingable for TcpPing {
    async fn ping(&self) -> Result<bool, ProbeError> {
        TcpStream::connect(&self.address).await?;
        Ok(true)
    }
}

/// Reachability by HTTP GET; any 2xx counts as up.
#[derive(Debug, Clone)]
pub struct HttpPing {
    client: reqwest::Client,
    url: String,
}

impl HttpPing {
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), url)
    }

    pub fn with_client(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

#[async_trait]
impl Pingable for HttpPing {
    async fn ping(&self) -> Result<bool, ProbeError> {
        let response = self.client.get(&self.url).send().await?;
        Ok(response.status().is_success())
    }
}

impl HealthCheck {
    /// Check backed by a `Pingable` dependency.
    pub fn from_pingable(name: impl Into<String>, target: Arc<dyn Pingable>) -> Self {
        HealthCheck::new(name, move || {
            let target = target.clone();
            async move { target.ping().await }
        })
    }

    /// Check whose probe runs through `breaker`. While the circuit is open
    /// the check fails immediately with the rejection text.
    ///
    /// The ping is bounded by `timeout` inside the breaker call, so a hung
    /// dependency is recorded as a breaker failure. The check's own deadline
    /// sits [`GUARD_GRACE`] later; overriding it with `with_timeout` can cut
    /// the breaker off before it records the outcome.
    pub fn guarded(
        name: impl Into<String>,
        target: Arc<dyn Pingable>,
        breaker: Arc<CircuitBreaker>,
        timeout: Duration,
    ) -> Self {
        HealthCheck::new(name, move || {
            let target = target.clone();
            let breaker = breaker.clone();
            async move {
                // A reachable-but-unhealthy answer counts against the breaker.
                let outcome = breaker
                    .execute(|| async {
                        match tokio::time::timeout(timeout, target.ping()).await {
                            Ok(Ok(true)) => Ok(()),
                            Ok(Ok(false)) => {
                                Err(ProbeError::from("dependency reported unhealthy"))
                            }
                            Ok(Err(e)) => Err(e),
                            Err(_) => Err(ProbeError::from(CheckError::ProbeTimeout(
                                timeout.as_millis() as u64,
                            ))),
                        }
                    })
                    .await;

                match outcome {
                    Ok(()) => Ok(true),
                    Err(CircuitBreakerError::Open(e)) => Err(e.into()),
                    Err(CircuitBreakerError::Inner(e)) => Err(e),
                }
            }
        })
        .with_timeout(timeout + GUARD_GRACE)
    }
}

/// Dependencies an instance may be wired to, each as a probe capability.
#[derive(Clone, Default)]
pub struct Dependencies {
    pub database: Option<Arc<dyn Pingable>>,
    pub cache: Option<Arc<dyn Pingable>>,
    pub inference: Option<Arc<dyn Pingable>>,
    pub vector_index: Option<Arc<dyn Pingable>>,
}

impl HealthMonitor {
    /// Monitor with one check per present dependency.
    pub fn with_default_checks(deps: &Dependencies, timeout: Duration) -> Self {
        let mut monitor = HealthMonitor::new();
        let defaults = [
            ("database", &deps.database, true),
            ("cache", &deps.cache, true),
            ("inference", &deps.inference, false),
            ("vector_index", &deps.vector_index, false),
        ];

        for (name, dep, critical) in defaults {
            if let Some(target) = dep {
                monitor.add_check(
                    HealthCheck::from_pingable(name, target.clone())
                        .with_timeout(timeout)
                        .critical(critical),
                );
            }
        }
        monitor
    }
}
