//! Shared utilities for integration tests.

use std::net::SocketAddr;
use tokio::net::TcpListener;

use reliability_core::config::{parse_config, ServiceConfig};
use reliability_core::{HttpServer, Services, Shutdown};

/// A running service bound to an ephemeral port.
pub struct TestService {
    pub addr: SocketAddr,
    pub services: Services,
    pub shutdown: Shutdown,
}

impl TestService {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for TestService {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

pub fn config(toml: &str) -> ServiceConfig {
    parse_config(toml).expect("test config should be valid")
}

/// Start the HTTP server for `config` and return once it is listening.
pub async fn start_service(config: ServiceConfig) -> TestService {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let services = Services::from_config(&config);
    let shutdown = Shutdown::new();
    let server = HttpServer::new(config, &services);
    let server_shutdown = shutdown.subscribe();

    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    TestService {
        addr,
        services,
        shutdown,
    }
}

/// HTTP client that never goes through a proxy.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}

/// A TCP listener that accepts and immediately drops connections.
#[allow(dead_code)]
pub async fn start_tcp_backend() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            drop(socket);
        }
    });

    addr
}

/// An address nothing is listening on.
#[allow(dead_code)]
pub async fn closed_port() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}
