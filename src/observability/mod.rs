//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Breakers and the health monitor produce:
//!     → logging.rs (structured tracing events)
//!     → metrics.rs (gauges, counters, histograms)
//!
//! Consumers:
//!     → stdout (pretty or JSON)
//!     → Prometheus scrape endpoint
//! ```
//!
//! # Design Decisions
//! - Emitting a log line or metric can never fail a breaker call or a health run
//! - Metric labels carry breaker and check names only

pub mod logging;
pub mod metrics;
