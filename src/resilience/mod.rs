//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Call to a protected dependency:
//!     → circuit_breaker.rs (gate, run once, record outcome)
//!
//! Health probe:
//!     → timeouts.rs (run on its own task, race a deadline, abort on expiry)
//! ```
//!
//! # Design Decisions
//! - Breakers observe outcomes only; retries are the caller's decision
//! - Every probe has a deadline; an expired probe is aborted, not awaited

pub mod circuit_breaker;
pub mod timeouts;

pub use circuit_breaker::{
    CircuitBreaker, CircuitBreakerConfig, CircuitBreakerError, CircuitOpenError, CircuitState,
    CircuitStats,
};
pub use timeouts::{run_with_deadline, DeadlineError};
