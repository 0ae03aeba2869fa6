//! tinylb: HTTP reverse-proxy load balancer.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client ──▶ http::server ──▶ dispatch ──▶ load_balancer::ServerPool
//!                                    │              (strategy + cursor)
//!                                    ▼
//!     Client ◀── http::response ◀── http::forward ◀──▶ Upstream
//!
//!     health::active probers ──HealthEvent──▶ applier ──▶ ServerPool::apply
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use clap::Parser;
use tokio::net::TcpListener;

use tinylb::config::{load_config, LogFormat};
use tinylb::lifecycle::{signals, Shutdown};
use tinylb::observability::{logging, metrics};
use tinylb::HttpServer;

#[derive(Debug, Parser)]
#[command(name = "tinylb", version, about = "HTTP reverse-proxy load balancer")]
struct Cli {
    /// Path to the configuration file (.toml or .json)
    config: PathBuf,

    /// Override the listener bind address
    #[arg(long)]
    bind: Option<String>,

    /// Override the log format
    #[arg(long, value_enum)]
    log_format: Option<LogFormat>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = load_config(&cli.config)?;
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
    }
    if let Some(format) = cli.log_format {
        config.observability.log_format = format;
    }

    let log_file = logging::init(&config.observability)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "tinylb starting");
    if let Some(path) = log_file {
        tracing::info!(path = %path.display(), "Writing JSON logs to file");
    }

    tracing::info!(
        config = %cli.config.display(),
        bind_address = %config.listener.bind_address,
        upstreams = config.servers.len(),
        strategy = %config.strategy,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    signals::forward_signals(shutdown.clone());

    HttpServer::new(config).run(listener, shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
