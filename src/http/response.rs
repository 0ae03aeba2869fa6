//! Response handling and transformation.
//!
//! # Responsibilities
//! - Carry a buffered upstream response back to the dispatch loop
//! - Turn the dispatch outcome into the client response
//! - Map pool exhaustion to 503 Service Unavailable
//!
//! # Design Decisions
//! - Upstream responses are buffered, so the loop can inspect the status
//!   before anything reaches the client
//! - Hop-by-hop headers stripped before the response leaves the proxy

use std::time::Duration;
use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};

/// What the forwarder observed for one round trip.
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
    /// Wall-clock duration of the round trip.
    pub elapsed: Duration,
}

impl UpstreamResponse {
    /// Synthesized response for an upstream that could not be reached.
    pub fn bad_gateway(elapsed: Duration) -> Self {
        Self {
            status: StatusCode::BAD_GATEWAY,
            headers: HeaderMap::new(),
            body: Bytes::from_static(b"Bad Gateway"),
            elapsed,
        }
    }
}

/// Final response handed to the client.
#[derive(Debug, Clone)]
pub struct ProxyResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl ProxyResponse {
    /// Answer for a request no upstream could serve.
    pub fn unavailable() -> Self {
        Self {
            status: StatusCode::SERVICE_UNAVAILABLE,
            headers: HeaderMap::new(),
            body: Bytes::from_static(b"No healthy upstreams"),
        }
    }
}

impl From<UpstreamResponse> for ProxyResponse {
    fn from(response: UpstreamResponse) -> Self {
        Self {
            status: response.status,
            headers: response.headers,
            body: response.body,
        }
    }
}

impl IntoResponse for ProxyResponse {
    fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}
