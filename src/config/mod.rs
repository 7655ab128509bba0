//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ServiceConfig (validated, immutable)
//!     → breakers, checks, listener built from it at startup
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; breaker thresholds never change at runtime
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    AdminConfig, BreakerConfig, CheckConfig, HealthConfig, ListenerConfig, LogFormat,
    ObservabilityConfig, ProbeKind, ServiceConfig,
};
