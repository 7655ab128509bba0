//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Validated config → breakers → health monitor (weak refs to breakers)
//!
//! Shutdown (shutdown.rs):
//!     Signal received → broadcast → server drains, poller exits
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → trigger graceful shutdown
//! ```

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use startup::{BreakerMap, Services};
