//! Reliability service.
//!
//! Loads breaker and health check definitions, polls health in the
//! background, and serves the health report and admin API over HTTP.
//!
//! ```text
//!   config.toml ──▶ Services ──┬──▶ HealthMonitor::run (poller)
//!                              │
//!                              └──▶ HttpServer
//!                                     GET  /health
//!                                     GET  /admin/breakers[/{name}]
//!                                     POST /admin/breakers/{name}/reset
//! ```

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tokio::net::TcpListener;

use reliability_core::config::{load_config, ServiceConfig};
use reliability_core::lifecycle::signals::wait_for_shutdown;
use reliability_core::observability::{logging, metrics};
use reliability_core::{HttpServer, Services, Shutdown};

#[derive(Parser)]
#[command(name = "reliability-core")]
#[command(about = "Circuit breaker and health monitoring service", long_about = None)]
struct Args {
    /// Path to a TOML configuration file. Defaults are used when omitted.
    #[arg(short, long, env = "RELIABILITY_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => ServiceConfig::default(),
    };

    logging::init_logging(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "reliability-core starting");

    tracing::info!(
        bind_address = %config.listener.bind_address,
        breakers = config.breakers.len(),
        checks = config.health.checks.len(),
        poll_interval_secs = config.health.poll_interval_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let services = Services::from_config(&config);
    let shutdown = Shutdown::new();

    let poller = if config.health.poll_enabled {
        let monitor = services.monitor.clone();
        let interval = Duration::from_secs(config.health.poll_interval_secs);
        Some(tokio::spawn(monitor.run(interval, shutdown.subscribe())))
    } else {
        tracing::info!("Background health polling disabled");
        None
    };

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let server = HttpServer::new(config, &services);
    let server_shutdown = shutdown.subscribe();

    let signal_shutdown = shutdown.clone();
    tokio::spawn(async move {
        wait_for_shutdown(&signal_shutdown).await;
    });

    server.run(listener, server_shutdown).await?;

    if let Some(poller) = poller {
        let _ = poller.await;
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
