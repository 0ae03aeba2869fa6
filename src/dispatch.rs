//! Per-request dispatch loop.
//!
//! # Data Flow
//! ```text
//! ProxyRequest + client identifier
//!     → pool.select() ── exhausted ──→ 503
//!     → begin_connection, forward, record_completion
//!     → status < 500 ──→ end_connection, return upstream response
//!     → status >= 500 ──→ mark_dead
//!         → retry off: return upstream response as is
//!         → retry on: next attempt
//!     → attempts == pool size ──→ 503
//! ```
//!
//! # Design Decisions
//! - At most one attempt per upstream, which bounds latency and guarantees
//!   termination when every upstream fails
//! - Any 5xx takes the upstream out of rotation immediately
//! - No backoff between attempts; the next attempt goes to a different upstream

use std::sync::Arc;
use std::time::Instant;

use crate::http::forward::Forwarder;
use crate::http::request::ProxyRequest;
use crate::http::response::ProxyResponse;
use crate::load_balancer::ServerPool;
use crate::observability::metrics;

/// Turns one inbound request into exactly one response.
#[derive(Debug)]
pub struct Dispatcher<F> {
    pool: Arc<ServerPool>,
    forwarder: F,
    retry_enabled: bool,
}

impl<F: Forwarder> Dispatcher<F> {
    pub fn new(pool: Arc<ServerPool>, forwarder: F, retry_enabled: bool) -> Self {
        Self {
            pool,
            forwarder,
            retry_enabled,
        }
    }

    pub fn pool(&self) -> &Arc<ServerPool> {
        &self.pool
    }

    /// Run the dispatch loop for `request` on behalf of `client`.
    pub async fn handle(&self, request: &ProxyRequest, client: &str) -> ProxyResponse {
        let start_time = Instant::now();
        let method = request.method.as_str();

        for attempt in 1..=self.pool.len() {
            let upstream = match self.pool.select(client) {
                Ok(u) => u,
                Err(e) => {
                    tracing::warn!(client = %client, attempt, error = %e, "No healthy upstreams");
                    metrics::record_request(method, 503, "none", start_time);
                    return ProxyResponse::unavailable();
                }
            };
            let upstream_label = upstream.endpoint().as_str();

            upstream.begin_connection();
            let response = self.forwarder.forward(request, upstream.endpoint()).await;
            upstream.record_completion(response.elapsed);

            let status = response.status.as_u16();
            if status < 500 {
                metrics::record_request(method, status, upstream_label, start_time);
                upstream.end_connection();
                return response.into();
            }

            metrics::record_upstream_failure(upstream_label, status);

            if !self.retry_enabled {
                tracing::warn!(upstream = %upstream_label, status, "Upstream failed, marking dead");
                metrics::record_request(method, status, upstream_label, start_time);
                upstream.mark_dead();
                return response.into();
            }

            tracing::warn!(
                upstream = %upstream_label,
                status,
                attempt,
                "Upstream failed, marking dead and retrying with next upstream"
            );
            upstream.mark_dead();
        }

        tracing::warn!(client = %client, path = %request.path_and_query(), "All upstream attempts failed");
        metrics::record_request(method, 503, "none", start_time);
        ProxyResponse::unavailable()
    }
}
