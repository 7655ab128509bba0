//! Dependency-failure isolation and composite health reporting.
//!
//! - [`resilience::CircuitBreaker`] gates calls to one dependency and fails
//!   fast while it is unhealthy.
//! - [`health::HealthMonitor`] runs liveness probes with deadlines, reads the
//!   registered breakers, and produces one [`health::SystemHealth`] report.

pub mod admin;
pub mod config;
pub mod health;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod resilience;

pub use config::schema::ServiceConfig;
pub use health::{HealthCheck, HealthMonitor, OverallStatus, SystemHealth};
pub use http::HttpServer;
pub use lifecycle::{Services, Shutdown};
pub use resilience::{CircuitBreaker, CircuitBreakerConfig, CircuitBreakerError, CircuitState};
