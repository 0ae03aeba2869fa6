//! Shared utilities for integration and load testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU16, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use tinylb::config::UpstreamConfig;
use tinylb::{BalancerConfig, HttpServer, ServerPool, Shutdown, Strategy};

/// Raw-TCP upstream answering "Hello from server {port}" with a switchable status.
///
/// `/health` answers with the same status so probes follow it.
pub struct MockBackend {
    pub addr: SocketAddr,
    status: Arc<AtomicU16>,
    hits: Arc<AtomicUsize>,
}

impl MockBackend {
    pub async fn start() -> Self {
        Self::with_status(200).await
    }

    pub async fn with_status(status: u16) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let status = Arc::new(AtomicU16::new(status));
        let hits = Arc::new(AtomicUsize::new(0));

        let (st, h) = (status.clone(), hits.clone());
        tokio::spawn(async move {
            loop {
                match listener.accept().await {
                    Ok((socket, _)) => {
                        let (st, h) = (st.clone(), h.clone());
                        tokio::spawn(async move {
                            serve(socket, addr.port(), st, h).await;
                        });
                    }
                    Err(_) => break,
                }
            }
        });

        Self { addr, status, hits }
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn set_status(&self, status: u16) {
        self.status.store(status, Ordering::SeqCst);
    }

    /// Requests served outside `/health`.
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    pub fn greeting(&self) -> String {
        format!("Hello from server {}", self.addr.port())
    }
}

async fn serve(mut socket: TcpStream, port: u16, status: Arc<AtomicU16>, hits: Arc<AtomicUsize>) {
    let head = read_head(&mut socket).await;
    let path = head.split_whitespace().nth(1).unwrap_or("/");

    let status = status.load(Ordering::SeqCst);
    let body = if path == "/health" {
        "OK".to_string()
    } else {
        hits.fetch_add(1, Ordering::SeqCst);
        format!("Hello from server {}", port)
    };

    let response = format!(
        "HTTP/1.1 {} Mock\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        body.len(),
        body
    );
    let _ = socket.write_all(response.as_bytes()).await;
    let _ = socket.shutdown().await;
}

async fn read_head(socket: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
        if buf.windows(4).any(|w| w == b"\r\n\r\n") {
            break;
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

/// Config pointing at `backends` with health checks off.
pub fn config(backends: &[&MockBackend], strategy: Strategy) -> BalancerConfig {
    let mut config = BalancerConfig::default();
    config.listener.bind_address = "127.0.0.1:0".to_string();
    config.servers = backends
        .iter()
        .map(|b| UpstreamConfig { url: b.url(), weight: 1 })
        .collect();
    config.strategy = strategy;
    config.health_check.enabled = false;
    config
}

/// A running balancer; shuts down on drop.
pub struct Balancer {
    pub addr: SocketAddr,
    pub pool: Arc<ServerPool>,
    shutdown: Shutdown,
}

impl Balancer {
    pub async fn start(config: BalancerConfig) -> Self {
        let listener = TcpListener::bind(&config.listener.bind_address).await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = HttpServer::new(config);
        let pool = server.pool().clone();
        let shutdown = Shutdown::new();

        let server_shutdown = shutdown.clone();
        tokio::spawn(async move {
            let _ = server.run(listener, server_shutdown).await;
        });

        Self { addr, pool, shutdown }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for Balancer {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
