//! HTTP subsystem.
//!
//! # Data Flow
//! ```text
//! GET /health
//!     → HealthMonitor::run_health_checks
//!     → SystemHealth as JSON (503 when unhealthy)
//!
//! /admin/* (bearer token)
//!     → breaker stats, manual reset
//! ```

pub mod server;

pub use server::{AppState, HttpServer};
