//! Upstream forwarding.
//!
//! # Responsibilities
//! - Send one buffered request to one upstream
//! - Buffer the upstream response and time the round trip
//!
//! # Design Decisions
//! - No retries and no status interpretation here; that is the dispatch loop's job
//! - Transport failures become a synthesized 502 so callers always get a status

use std::future::Future;
use std::time::Instant;
use axum::body::Body;
use hyper::body::Incoming;
use hyper_util::{
    client::legacy::{Client, connect::HttpConnector},
    rt::TokioExecutor,
};
use thiserror::Error;
use url::Url;

use crate::http::request::{strip_hop_by_hop, ProxyRequest, MAX_BODY_BYTES};
use crate::http::response::UpstreamResponse;

/// Transport-level forwarding failure.
#[derive(Debug, Error)]
pub enum ForwardError {
    #[error("invalid upstream request: {0}")]
    Request(#[from] axum::http::Error),

    #[error("upstream request failed: {0}")]
    Client(#[from] hyper_util::client::legacy::Error),

    #[error("failed to read upstream body: {0}")]
    Body(#[from] axum::Error),
}

/// Moves one request to one upstream and reports what came back.
pub trait Forwarder: Send + Sync {
    fn forward(
        &self,
        request: &ProxyRequest,
        endpoint: &Url,
    ) -> impl Future<Output = UpstreamResponse> + Send;
}

/// Forwarder backed by a pooled hyper client.
#[derive(Debug, Clone)]
pub struct HttpForwarder {
    client: Client<HttpConnector, Body>,
    /// Upstream bodies larger than this become a 502.
    body_limit: usize,
}

impl HttpForwarder {
    pub fn new() -> Self {
        let client = Client::builder(TokioExecutor::new())
            .build(HttpConnector::new());
        Self {
            client,
            body_limit: MAX_BODY_BYTES,
        }
    }

    pub fn with_body_limit(mut self, limit: usize) -> Self {
        self.body_limit = limit;
        self
    }

    async fn round_trip(&self, request: &ProxyRequest, endpoint: &Url) -> Result<UpstreamResponse, ForwardError> {
        let upstream_request = request.to_upstream(endpoint)?;
        let start = Instant::now();

        let response: hyper::Response<Incoming> = self.client.request(upstream_request).await?;
        let (mut parts, body) = response.into_parts();
        let body = axum::body::to_bytes(Body::new(body), self.body_limit).await?;
        strip_hop_by_hop(&mut parts.headers);

        Ok(UpstreamResponse {
            status: parts.status,
            headers: parts.headers,
            body,
            elapsed: start.elapsed(),
        })
    }
}

impl Default for HttpForwarder {
    fn default() -> Self {
        Self::new()
    }
}

impl Forwarder for HttpForwarder {
    async fn forward(&self, request: &ProxyRequest, endpoint: &Url) -> UpstreamResponse {
        let start = Instant::now();
        match self.round_trip(request, endpoint).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(upstream = %endpoint, error = %e, "Upstream request failed");
                UpstreamResponse::bad_gateway(start.elapsed())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Bytes;
    use axum::http::{HeaderMap, Method, StatusCode};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn get(path: &str) -> ProxyRequest {
        ProxyRequest {
            method: Method::GET,
            uri: path.parse().unwrap(),
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    #[tokio::test]
    async fn unreachable_upstream_is_bad_gateway() {
        // Bind then drop to get a port nobody listens on
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let forwarder = HttpForwarder::new();
        let endpoint = Url::parse(&format!("http://{}", addr)).unwrap();
        let response = forwarder.forward(&get("/"), &endpoint).await;
        assert_eq!(response.status, StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn forwards_and_buffers_response() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            let _ = socket.read(&mut buf).await;
            let _ = socket
                .write_all(b"HTTP/1.1 418 I'm a teapot\r\nContent-Length: 5\r\nConnection: close\r\nX-Upstream: yes\r\n\r\nshort")
                .await;
            let _ = socket.shutdown().await;
        });

        let forwarder = HttpForwarder::new();
        let endpoint = Url::parse(&format!("http://{}", addr)).unwrap();
        let response = forwarder.forward(&get("/tea"), &endpoint).await;

        assert_eq!(response.status, StatusCode::IM_A_TEAPOT);
        assert_eq!(response.body, Bytes::from_static(b"short"));
        assert_eq!(response.headers["x-upstream"], "yes");
        assert!(response.headers.get("connection").is_none());
    }

    #[tokio::test]
    async fn oversized_upstream_body_is_bad_gateway() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            let _ = socket.read(&mut buf).await;
            let _ = socket
                .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 10\r\nConnection: close\r\n\r\n0123456789")
                .await;
            let _ = socket.shutdown().await;
        });

        let forwarder = HttpForwarder::new().with_body_limit(4);
        let endpoint = Url::parse(&format!("http://{}", addr)).unwrap();
        let response = forwarder.forward(&get("/big"), &endpoint).await;

        assert_eq!(response.status, StatusCode::BAD_GATEWAY);
        assert_eq!(response.body, Bytes::from_static(b"Bad Gateway"));
    }
}
