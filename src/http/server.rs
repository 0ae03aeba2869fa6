//! HTTP server setup.
//!
//! # Responsibilities
//! - Build the server pool, forwarder and dispatcher from configuration
//! - Create the Axum router with a single catch-all proxy handler
//! - Wire up middleware (tracing, request ID)
//! - Start the health monitor alongside the listener
//! - Stop accepting and drain on shutdown

use std::net::SocketAddr;
use std::sync::Arc;
use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{header, HeaderName, Request, StatusCode},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::BalancerConfig;
use crate::dispatch::Dispatcher;
use crate::health::{HealthMonitor, ProbeSettings};
use crate::http::forward::HttpForwarder;
use crate::http::request::{ProxyRequest, MAX_BODY_BYTES};
use crate::lifecycle::Shutdown;
use crate::load_balancer::ServerPool;

const X_REQUEST_ID: &str = "x-request-id";

/// Application state injected into the handler.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher<HttpForwarder>>,
}

/// HTTP front end of the balancer.
pub struct HttpServer {
    router: Router,
    config: BalancerConfig,
    pool: Arc<ServerPool>,
}

impl HttpServer {
    pub fn new(config: BalancerConfig) -> Self {
        let pool = Arc::new(ServerPool::new(config.upstreams(), config.strategy));
        let dispatcher = Dispatcher::new(pool.clone(), HttpForwarder::new(), config.retry_requests);

        tracing::info!(
            upstreams = pool.len(),
            strategy = %config.strategy,
            retry_requests = config.retry_requests,
            "Server pool ready"
        );

        let state = AppState {
            dispatcher: Arc::new(dispatcher),
        };

        Self {
            router: Self::build_router(state),
            config,
            pool,
        }
    }

    fn build_router(state: AppState) -> Router {
        let request_id = HeaderName::from_static(X_REQUEST_ID);

        Router::new()
            .route("/", any(proxy_handler))
            .route("/{*path}", any(proxy_handler))
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::new(request_id.clone(), MakeRequestUuid))
                    .layer(TraceLayer::new_for_http())
                    .layer(PropagateRequestIdLayer::new(request_id)),
            )
    }

    /// Shared pool, for inspection.
    pub fn pool(&self) -> &Arc<ServerPool> {
        &self.pool
    }

    pub fn config(&self) -> &BalancerConfig {
        &self.config
    }

    /// Serve on `listener` until `shutdown` fires.
    pub async fn run(self, listener: TcpListener, shutdown: Shutdown) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let monitor = if self.config.health_check.enabled {
            match ProbeSettings::from_config(&self.config.health_check) {
                Ok(settings) => Some(HealthMonitor::new(self.pool.clone(), settings).spawn(&shutdown)),
                Err(e) => {
                    tracing::error!(error = %e, "Invalid health check settings, health checks disabled");
                    None
                }
            }
        } else {
            tracing::info!("Health checks disabled");
            None
        };

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown.wait())
            .await?;

        if let Some(handle) = monitor {
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "Health monitor task failed");
            }
        }

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Buffer the request and hand it to the dispatch loop.
async fn proxy_handler(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    request: Request<Body>,
) -> Response {
    let client = peer.ip().to_string();

    let declared = request
        .headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok());
    if declared.is_some_and(|len| len > MAX_BODY_BYTES) {
        return (StatusCode::PAYLOAD_TOO_LARGE, "Request body too large").into_response();
    }

    let request = match ProxyRequest::buffer(request, MAX_BODY_BYTES).await {
        Ok(r) => r,
        Err(e) => {
            tracing::warn!(client = %client, error = %e, "Failed to read request body");
            return (StatusCode::BAD_REQUEST, "Failed to read request body").into_response();
        }
    };

    tracing::debug!(
        client = %client,
        method = %request.method,
        path = %request.path_and_query(),
        "Proxying request"
    );

    state.dispatcher.handle(&request, &client).await.into_response()
}
