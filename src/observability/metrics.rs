//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define proxy metrics (requests, latency, upstream failures, health)
//! - Expose Prometheus-compatible metrics endpoint
//! - Track per-upstream and aggregate metrics
//!
//! # Metrics
//! - `proxy_requests_total` (counter): total requests by method, status, upstream
//! - `proxy_request_duration_seconds` (histogram): latency distribution
//! - `proxy_upstream_failures_total` (counter): 5xx answers by upstream
//! - `proxy_upstream_health` (gauge): 1=healthy, 0=unhealthy
//!
//! # Design Decisions
//! - Low-overhead metric updates (atomic operations)
//! - Labels for upstream, method, status code

use std::net::SocketAddr;
use std::time::Instant;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter listening on `addr`.
///
/// Must be called from within a tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record a finished client request.
pub fn record_request(method: &str, status: u16, upstream: &str, start: Instant) {
    counter!(
        "proxy_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string(),
        "upstream" => upstream.to_string()
    )
    .increment(1);

    histogram!(
        "proxy_request_duration_seconds",
        "method" => method.to_string(),
        "upstream" => upstream.to_string()
    )
    .record(start.elapsed().as_secs_f64());
}

/// Record an upstream answering with a server error.
pub fn record_upstream_failure(upstream: &str, status: u16) {
    counter!(
        "proxy_upstream_failures_total",
        "upstream" => upstream.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record the current health of an upstream.
pub fn record_upstream_health(upstream: &str, healthy: bool) {
    gauge!("proxy_upstream_health", "upstream" => upstream.to_string())
        .set(if healthy { 1.0 } else { 0.0 });
}
