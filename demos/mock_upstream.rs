//! Mock upstream for trying the balancer by hand.
//!
//! ```text
//! cargo run --example mock-upstream -- 8081
//! ```
//!
//! Every path answers "Hello from server {port}". `/slow?duration=ms` sleeps
//! first (default 1000ms) and `/health` answers "OK".

use std::net::SocketAddr;
use std::time::Duration;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Router,
};
use clap::Parser;
use serde::Deserialize;

#[derive(Debug, Parser)]
#[command(name = "mock-upstream", about = "Mock upstream for tinylb")]
struct Args {
    /// Port to listen on
    port: u16,
}

#[derive(Debug, Deserialize)]
struct SlowParams {
    duration: Option<String>,
}

async fn hello(State(port): State<u16>) -> String {
    format!("Hello from server {}\n", port)
}

async fn slow(State(port): State<u16>, Query(params): Query<SlowParams>) -> impl IntoResponse {
    let millis = match params.duration.as_deref().map(str::parse::<u64>) {
        None => 1000,
        Some(Ok(ms)) => ms,
        Some(Err(_)) => return (StatusCode::BAD_REQUEST, "Invalid timeout".to_string()),
    };
    tokio::time::sleep(Duration::from_millis(millis)).await;
    (StatusCode::OK, format!("Hello from server {}\n", port))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    let app = Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/slow", get(slow))
        .fallback(hello)
        .with_state(args.port);

    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(address = %addr, "Mock upstream listening");
    axum::serve(listener, app).await?;
    Ok(())
}
