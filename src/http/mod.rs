//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, tracing)
//!     → request.rs (buffer body, rewrite URI, strip hop-by-hop headers)
//!     → dispatch loop picks an upstream
//!     → forward.rs (round trip to the upstream)
//!     → response.rs (buffered response back to the client)
//! ```

pub mod forward;
pub mod request;
pub mod response;
pub mod server;

pub use forward::{Forwarder, HttpForwarder};
pub use request::ProxyRequest;
pub use response::{ProxyResponse, UpstreamResponse};
pub use server::HttpServer;
