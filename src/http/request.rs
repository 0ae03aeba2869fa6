//! Request handling and transformation.
//!
//! # Responsibilities
//! - Buffer the inbound request so it can be replayed against several upstreams
//! - Rewrite the URI onto the selected upstream
//! - Strip hop-by-hop headers before forwarding
//!
//! # Design Decisions
//! - Bodies are buffered in full; a retry needs the same bytes again
//! - The upstream's own authority is used for `Host`
//! - The upstream URL's path acts as a prefix for the request path

use axum::body::{Body, Bytes};
use axum::http::{header, HeaderMap, HeaderName, Method, Request, Uri};
use url::{Position, Url};

/// Largest body buffered in either direction.
pub const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

/// Headers that only make sense for a single connection hop.
pub const HOP_BY_HOP: [HeaderName; 7] = [
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
    HeaderName::from_static("proxy-connection"),
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

/// Remove hop-by-hop headers, including any named in `Connection`.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let named: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();

    for name in named.iter().chain(HOP_BY_HOP.iter()) {
        headers.remove(name);
    }
}

/// A fully buffered inbound request.
#[derive(Debug, Clone)]
pub struct ProxyRequest {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl ProxyRequest {
    /// Buffer an inbound request, reading at most `body_limit` bytes of body.
    pub async fn buffer(request: Request<Body>, body_limit: usize) -> Result<Self, axum::Error> {
        let (parts, body) = request.into_parts();
        let body = axum::body::to_bytes(body, body_limit).await?;
        Ok(Self {
            method: parts.method,
            uri: parts.uri,
            headers: parts.headers,
            body,
        })
    }

    /// Path and query of the inbound request.
    pub fn path_and_query(&self) -> &str {
        self.uri.path_and_query().map_or("/", |pq| pq.as_str())
    }

    /// Build the request to send to `endpoint`.
    pub fn to_upstream(&self, endpoint: &Url) -> Result<Request<Body>, axum::http::Error> {
        let uri = upstream_uri(endpoint, &self.uri)?;

        let mut headers = self.headers.clone();
        strip_hop_by_hop(&mut headers);
        headers.remove(header::HOST);

        let mut builder = Request::builder().method(self.method.clone()).uri(uri);
        if let Some(h) = builder.headers_mut() {
            h.extend(headers);
        }
        builder.body(Body::from(self.body.clone()))
    }
}

/// Join the upstream base URL with the inbound path and query.
pub fn upstream_uri(endpoint: &Url, inbound: &Uri) -> Result<Uri, axum::http::Error> {
    let authority = &endpoint[Position::BeforeHost..Position::AfterPort];
    let prefix = endpoint.path().trim_end_matches('/');

    let mut target = format!("{}://{}{}{}", endpoint.scheme(), authority, prefix, inbound.path());
    match (endpoint.query(), inbound.query()) {
        (Some(base), Some(query)) => {
            target.push('?');
            target.push_str(base);
            target.push('&');
            target.push_str(query);
        }
        (Some(query), None) | (None, Some(query)) => {
            target.push('?');
            target.push_str(query);
        }
        (None, None) => {}
    }

    Ok(target.parse::<Uri>()?)
}
