//! Circuit breaker for dependency protection.
//!
//! # States
//! - Closed: normal operation, calls pass through
//! - Open: dependency assumed down, calls fail fast
//! - Half-Open: trial calls test whether the dependency recovered
//!
//! # State Transitions
//! ```text
//! Closed → Open: failures within monitoring window >= failure_threshold
//! Open → Half-Open: first call attempt after recovery_timeout (lazy)
//! Half-Open → Closed: consecutive successes >= success_threshold
//! Half-Open → Open: any trial failure
//! ```
//!
//! # Design Decisions
//! - One breaker per dependency, owned by the caller
//! - Failures are counted in a sliding time window, wiped by any success
//! - Rejections are not failures and never reach the operation
//! - The wrapped error is passed through untouched

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;

use crate::observability::metrics;

/// Breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl CircuitState {
    /// Numeric encoding used for the state gauge.
    pub fn as_gauge(self) -> f64 {
        match self {
            CircuitState::Closed => 0.0,
            CircuitState::Open => 1.0,
            CircuitState::HalfOpen => 2.0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CircuitState::Closed => "CLOSED",
            CircuitState::Open => "OPEN",
            CircuitState::HalfOpen => "HALF_OPEN",
        }
    }
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable thresholds for one breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CircuitBreakerConfig {
    /// Failures within `monitoring_window` that open the circuit.
    pub failure_threshold: u32,
    /// How long the circuit stays open after the last failure.
    pub recovery_timeout: Duration,
    /// Trailing span over which failures are counted.
    pub monitoring_window: Duration,
    /// Consecutive half-open successes needed to close.
    pub success_threshold: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            recovery_timeout: Duration::from_secs(30),
            monitoring_window: Duration::from_secs(60),
            success_threshold: 3,
        }
    }
}

/// Returned when the breaker rejects a call without invoking it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("circuit breaker '{name}' is open")]
pub struct CircuitOpenError {
    pub name: String,
}

/// Outcome of a failed `execute` call.
#[derive(Debug, Error)]
pub enum CircuitBreakerError<E> {
    /// The call was rejected by the breaker.
    #[error(transparent)]
    Open(#[from] CircuitOpenError),

    /// The operation ran and failed; the error is passed through unchanged.
    #[error("{0}")]
    Inner(E),
}

impl<E> CircuitBreakerError<E> {
    pub fn is_open(&self) -> bool {
        matches!(self, CircuitBreakerError::Open(_))
    }

    /// Recover the operation's own error, if the operation ran.
    pub fn into_inner(self) -> Option<E> {
        match self {
            CircuitBreakerError::Inner(e) => Some(e),
            CircuitBreakerError::Open(_) => None,
        }
    }
}

/// Read-only snapshot of a breaker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CircuitStats {
    pub name: String,
    pub state: CircuitState,
    /// Failures retained in the monitoring window at last prune.
    pub failures: usize,
    /// Consecutive successes while half-open.
    pub successes: u32,
    pub last_failure_at: Option<DateTime<Utc>>,
}

#[derive(Debug)]
struct BreakerInner {
    state: CircuitState,
    failures: VecDeque<Instant>,
    consecutive_successes: u32,
    last_failure: Option<Instant>,
    last_failure_at: Option<DateTime<Utc>>,
}

impl BreakerInner {
    fn new() -> Self {
        Self {
            state: CircuitState::Closed,
            failures: VecDeque::new(),
            consecutive_successes: 0,
            last_failure: None,
            last_failure_at: None,
        }
    }

    fn prune(&mut self, now: Instant, window: Duration) {
        while let Some(&oldest) = self.failures.front() {
            if now.saturating_duration_since(oldest) > window {
                self.failures.pop_front();
            } else {
                break;
            }
        }
    }

    fn push_failure(&mut self, now: Instant, window: Duration) {
        self.prune(now, window);
        self.failures.push_back(now);
        self.last_failure = Some(now);
        self.last_failure_at = Some(Utc::now());
    }
}

/// A circuit breaker guarding calls to a single dependency.
///
/// State is kept behind a mutex that is never held across an await, so one
/// breaker can be shared (`Arc`) by any number of concurrent callers.
/// Admission and outcome recording are separate steps; interleaved calls may
/// complete in any order.
#[derive(Debug)]
pub struct CircuitBreaker {
    name: String,
    config: CircuitBreakerConfig,
    inner: Mutex<BreakerInner>,
}

impl CircuitBreaker {
    /// Create a closed breaker.
    pub fn new(name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        let name = name.into();
        tracing::debug!(
            breaker = %name,
            failure_threshold = config.failure_threshold,
            recovery_timeout_ms = config.recovery_timeout.as_millis() as u64,
            monitoring_window_ms = config.monitoring_window.as_millis() as u64,
            success_threshold = config.success_threshold,
            "Circuit breaker created"
        );
        metrics::record_breaker_state(&name, CircuitState::Closed);

        Self {
            name,
            config,
            inner: Mutex::new(BreakerInner::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    /// Current state. Does not perform the lazy Open → Half-Open transition.
    pub fn state(&self) -> CircuitState {
        self.lock().state
    }

    pub fn stats(&self) -> CircuitStats {
        let inner = self.lock();
        CircuitStats {
            name: self.name.clone(),
            state: inner.state,
            failures: inner.failures.len(),
            successes: inner.consecutive_successes,
            last_failure_at: inner.last_failure_at,
        }
    }

    /// Force the breaker closed and clear every counter.
    pub fn reset(&self) {
        let previous = {
            let mut inner = self.lock();
            let previous = inner.state;
            *inner = BreakerInner::new();
            previous
        };
        tracing::info!(breaker = %self.name, from = %previous, "Circuit breaker reset");
        if previous != CircuitState::Closed {
            metrics::record_breaker_transition(&self.name, previous, CircuitState::Closed);
        }
        metrics::record_breaker_state(&self.name, CircuitState::Closed);
    }

    /// Run `operation` through the breaker.
    ///
    /// Fails with [`CircuitBreakerError::Open`] without invoking the operation
    /// while the circuit is open. Otherwise the operation runs exactly once and
    /// its outcome is recorded.
    pub async fn execute<F, Fut, T, E>(&self, operation: F) -> Result<T, CircuitBreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.try_acquire()?;

        match operation().await {
            Ok(value) => {
                self.on_success();
                Ok(value)
            }
            Err(e) => {
                self.on_failure();
                Err(CircuitBreakerError::Inner(e))
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, BreakerInner> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn try_acquire(&self) -> Result<(), CircuitOpenError> {
        let mut inner = self.lock();
        if inner.state != CircuitState::Open {
            return Ok(());
        }

        let now = Instant::now();
        let cooling = inner
            .last_failure
            .map(|at| now.saturating_duration_since(at) < self.config.recovery_timeout)
            .unwrap_or(false);

        if cooling {
            drop(inner);
            tracing::debug!(breaker = %self.name, "Call rejected, circuit open");
            metrics::record_breaker_rejection(&self.name);
            return Err(CircuitOpenError {
                name: self.name.clone(),
            });
        }

        inner.state = CircuitState::HalfOpen;
        inner.consecutive_successes = 0;
        drop(inner);
        self.transitioned(CircuitState::Open, CircuitState::HalfOpen);
        Ok(())
    }

    fn on_success(&self) {
        let mut inner = self.lock();
        match inner.state {
            CircuitState::Closed => {
                inner.failures.clear();
            }
            CircuitState::HalfOpen => {
                inner.consecutive_successes += 1;
                if inner.consecutive_successes >= self.config.success_threshold {
                    inner.state = CircuitState::Closed;
                    inner.failures.clear();
                    inner.consecutive_successes = 0;
                    drop(inner);
                    self.transitioned(CircuitState::HalfOpen, CircuitState::Closed);
                }
            }
            CircuitState::Open => {
                // Admitted before the circuit opened; the verdict stands.
                tracing::debug!(breaker = %self.name, "Late success ignored while open");
            }
        }
    }

    fn on_failure(&self) {
        let now = Instant::now();
        let mut inner = self.lock();
        inner.push_failure(now, self.config.monitoring_window);

        match inner.state {
            CircuitState::Closed => {
                if inner.failures.len() >= self.config.failure_threshold as usize {
                    inner.state = CircuitState::Open;
                    let failures = inner.failures.len();
                    drop(inner);
                    tracing::warn!(
                        breaker = %self.name,
                        failures,
                        failure_threshold = self.config.failure_threshold,
                        "Failure threshold reached"
                    );
                    self.transitioned(CircuitState::Closed, CircuitState::Open);
                }
            }
            CircuitState::HalfOpen => {
                inner.state = CircuitState::Open;
                inner.consecutive_successes = 0;
                drop(inner);
                self.transitioned(CircuitState::HalfOpen, CircuitState::Open);
            }
            CircuitState::Open => {}
        }
    }

    fn transitioned(&self, from: CircuitState, to: CircuitState) {
        match to {
            CircuitState::Open => tracing::warn!(
                breaker = %self.name,
                from = %from,
                recovery_timeout_ms = self.config.recovery_timeout.as_millis() as u64,
                "Circuit breaker opened"
            ),
            CircuitState::HalfOpen => tracing::info!(
                breaker = %self.name,
                success_threshold = self.config.success_threshold,
                "Circuit breaker half-open, admitting trial calls"
            ),
            CircuitState::Closed => {
                tracing::info!(breaker = %self.name, from = %from, "Circuit breaker closed")
            }
        }
        metrics::record_breaker_transition(&self.name, from, to);
        metrics::record_breaker_state(&self.name, to);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::sync::Notify;
    use tokio::time::advance;

    fn config(failures: u32, successes: u32) -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            failure_threshold: failures,
            recovery_timeout: Duration::from_secs(10),
            monitoring_window: Duration::from_secs(60),
            success_threshold: successes,
        }
    }

    async fn fail(cb: &CircuitBreaker) -> Result<(), CircuitBreakerError<&'static str>> {
        cb.execute(|| async { Err::<(), _>("boom") }).await
    }

    async fn succeed(cb: &CircuitBreaker) -> Result<u32, CircuitBreakerError<&'static str>> {
        cb.execute(|| async { Ok::<_, &'static str>(7) }).await
    }

    #[tokio::test(start_paused = true)]
    async fn test_opens_at_threshold_and_rejects() {
        let cb = CircuitBreaker::new("db", config(3, 1));

        for _ in 0..2 {
            assert!(fail(&cb).await.is_err());
            assert_eq!(cb.state(), CircuitState::Closed);
        }
        assert!(fail(&cb).await.is_err());
        assert_eq!(cb.state(), CircuitState::Open);

        let calls = AtomicU32::new(0);
        let result = cb
            .execute(|| async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, &str>(())
            })
            .await;

        match result {
            Err(CircuitBreakerError::Open(e)) => assert_eq!(e.name, "db"),
            other => panic!("expected rejection, got {:?}", other),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        // Rejections do not count as failures.
        assert_eq!(cb.stats().failures, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_operation_error_passes_through() {
        let cb = CircuitBreaker::new("search", config(5, 1));
        let err = fail(&cb).await.unwrap_err();
        assert!(!err.is_open());
        assert_eq!(err.into_inner(), Some("boom"));
        assert_eq!(succeed(&cb).await.unwrap(), 7);
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_wipes_failures_while_closed() {
        let cb = CircuitBreaker::new("kv", config(3, 1));
        let _ = fail(&cb).await;
        let _ = fail(&cb).await;
        assert_eq!(cb.stats().failures, 2);

        succeed(&cb).await.unwrap();
        assert_eq!(cb.stats().failures, 0);

        let _ = fail(&cb).await;
        let _ = fail(&cb).await;
        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failures_outside_window_are_pruned() {
        let cb = CircuitBreaker::new("ai", config(3, 1));
        let _ = fail(&cb).await;
        let _ = fail(&cb).await;

        advance(Duration::from_secs(61)).await;
        let _ = fail(&cb).await;

        assert_eq!(cb.stats().failures, 1);
        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_success_while_open_is_ignored() {
        let cb = CircuitBreaker::new("db", config(1, 1));
        let gate = Notify::new();

        let late = cb.execute(|| async {
            gate.notified().await;
            Ok::<_, &str>(1)
        });
        let (late, _) = tokio::join!(late, async {
            assert!(fail(&cb).await.is_err());
            assert_eq!(cb.state(), CircuitState::Open);
            gate.notify_one();
        });

        assert_eq!(late.unwrap(), 1);
        assert_eq!(cb.state(), CircuitState::Open);
        assert_eq!(cb.stats().failures, 1);
        assert_eq!(cb.stats().successes, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_failure_while_open_extends_cooldown() {
        let cb = CircuitBreaker::new("db", config(1, 1));
        let gate = Notify::new();

        let late = cb.execute(|| async {
            gate.notified().await;
            Err::<(), _>("slow boom")
        });
        let (late, _) = tokio::join!(late, async {
            assert!(fail(&cb).await.is_err());
            advance(Duration::from_secs(5)).await;
            gate.notify_one();
        });

        assert_eq!(late.unwrap_err().into_inner(), Some("slow boom"));
        assert_eq!(cb.state(), CircuitState::Open);
        assert_eq!(cb.stats().failures, 2);

        // Recovery counts from the late failure, not the one that opened.
        advance(Duration::from_secs(6)).await;
        assert!(succeed(&cb).await.unwrap_err().is_open());

        advance(Duration::from_secs(5)).await;
        assert_eq!(succeed(&cb).await.unwrap(), 7);
        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_half_open_after_recovery_timeout() {
        let cb = CircuitBreaker::new("payments", config(1, 2));
        let _ = fail(&cb).await;
        assert_eq!(cb.state(), CircuitState::Open);

        advance(Duration::from_secs(9)).await;
        assert!(succeed(&cb).await.unwrap_err().is_open());

        advance(Duration::from_secs(2)).await;
        // Transition is lazy: state() alone does not move it.
        assert_eq!(cb.state(), CircuitState::Open);

        let calls = AtomicU32::new(0);
        cb.execute(|| async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, &str>(())
        })
        .await
        .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cb.state(), CircuitState::HalfOpen);
        assert_eq!(cb.stats().successes, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_half_open_failure_reopens() {
        let cb = CircuitBreaker::new("storage", config(1, 3));
        let _ = fail(&cb).await;
        advance(Duration::from_secs(11)).await;

        succeed(&cb).await.unwrap();
        succeed(&cb).await.unwrap();
        assert_eq!(cb.state(), CircuitState::HalfOpen);

        let _ = fail(&cb).await;
        assert_eq!(cb.state(), CircuitState::Open);
        assert_eq!(cb.stats().successes, 0);
        assert!(succeed(&cb).await.unwrap_err().is_open());
    }

    #[tokio::test(start_paused = true)]
    async fn test_half_open_successes_close_and_clear() {
        let cb = CircuitBreaker::new("vector", config(2, 2));
        let _ = fail(&cb).await;
        let _ = fail(&cb).await;
        assert_eq!(cb.state(), CircuitState::Open);

        advance(Duration::from_secs(11)).await;
        succeed(&cb).await.unwrap();
        succeed(&cb).await.unwrap();

        let stats = cb.stats();
        assert_eq!(stats.state, CircuitState::Closed);
        assert_eq!(stats.failures, 0);
        assert_eq!(stats.successes, 0);

        // Threshold rebuilds from zero.
        let _ = fail(&cb).await;
        assert_eq!(cb.state(), CircuitState::Closed);
        let _ = fail(&cb).await;
        assert_eq!(cb.state(), CircuitState::Open);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_from_any_state() {
        let cb = CircuitBreaker::new("db", config(1, 5));
        let _ = fail(&cb).await;
        assert_eq!(cb.state(), CircuitState::Open);
        assert!(cb.stats().last_failure_at.is_some());

        cb.reset();
        let stats = cb.stats();
        assert_eq!(stats.state, CircuitState::Closed);
        assert_eq!(stats.failures, 0);
        assert_eq!(stats.successes, 0);
        assert_eq!(stats.last_failure_at, None);

        let _ = fail(&cb).await;
        advance(Duration::from_secs(11)).await;
        succeed(&cb).await.unwrap();
        assert_eq!(cb.state(), CircuitState::HalfOpen);
        cb.reset();
        assert_eq!(cb.stats().successes, 0);
        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[tokio::test]
    async fn test_concurrent_failures_are_not_lost() {
        let cb = std::sync::Arc::new(CircuitBreaker::new(
            "shared",
            CircuitBreakerConfig {
                failure_threshold: 1000,
                ..CircuitBreakerConfig::default()
            },
        ));

        let mut handles = Vec::new();
        for _ in 0..50 {
            let cb = cb.clone();
            handles.push(tokio::spawn(async move {
                let _ = cb.execute(|| async { Err::<(), _>("x") }).await;
            }));
        }
        for h in handles {
            h.await.unwrap();
        }

        assert_eq!(cb.stats().failures, 50);
    }

    #[test]
    fn test_state_serializes_screaming_case() {
        assert_eq!(
            serde_json::to_string(&CircuitState::HalfOpen).unwrap(),
            "\"HALF_OPEN\""
        );
    }
}
