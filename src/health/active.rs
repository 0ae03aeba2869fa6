//! Active health checking.
//!
//! # Responsibilities
//! - Periodically probe every upstream's health endpoint
//! - Publish the result as a `HealthEvent`
//! - Apply events to the pool from a single task

use std::sync::Arc;
use std::time::Duration;
use axum::body::Body;
use axum::http::{Request, Uri};
use hyper_util::{
    client::legacy::{Client, connect::HttpConnector},
    rt::TokioExecutor,
};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use url::Url;

use crate::config::HealthCheckConfig;
use crate::health::state::HealthEvent;
use crate::http::request::upstream_uri;
use crate::lifecycle::Shutdown;
use crate::load_balancer::ServerPool;
use crate::observability::metrics;

/// Probe settings resolved from configuration.
#[derive(Debug, Clone)]
pub struct ProbeSettings {
    pub interval: Duration,
    pub timeout: Duration,
    pub path: String,
}

impl ProbeSettings {
    pub fn from_config(config: &HealthCheckConfig) -> Result<Self, humantime::DurationError> {
        Ok(Self {
            interval: config.interval()?,
            timeout: config.timeout()?,
            path: config.path.clone(),
        })
    }
}

pub struct HealthMonitor {
    pool: Arc<ServerPool>,
    settings: ProbeSettings,
    client: Client<HttpConnector, Body>,
}

impl HealthMonitor {
    pub fn new(pool: Arc<ServerPool>, settings: ProbeSettings) -> Self {
        let client = Client::builder(TokioExecutor::new())
            .build(HttpConnector::new());

        Self {
            pool,
            settings,
            client,
        }
    }

    /// Spawn one prober per upstream plus the event applier.
    ///
    /// All tasks exit when `shutdown` fires. The returned handle completes once
    /// the applier has drained every event.
    pub fn spawn(self, shutdown: &Shutdown) -> JoinHandle<()> {
        tracing::info!(
            interval = ?self.settings.interval,
            path = %self.settings.path,
            upstreams = self.pool.len(),
            "Health monitor starting"
        );

        let (events_tx, events_rx) = mpsc::channel(self.pool.len().max(1) * 4);
        let monitor = Arc::new(self);

        for (index, upstream) in monitor.pool.upstreams().iter().enumerate() {
            let monitor = monitor.clone();
            let endpoint = upstream.endpoint().clone();
            let events = events_tx.clone();
            let shutdown = shutdown.subscribe();
            tokio::spawn(async move {
                monitor.probe_loop(index, endpoint, events, shutdown).await;
            });
        }
        drop(events_tx);

        let pool = monitor.pool.clone();
        tokio::spawn(apply_events(pool, events_rx))
    }

    async fn probe_loop(
        &self,
        index: usize,
        endpoint: Url,
        events: mpsc::Sender<HealthEvent>,
        mut shutdown: broadcast::Receiver<()>,
    ) {
        let mut ticker = time::interval(self.settings.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // First probe one interval after start
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let status = self.probe(&endpoint).await;
                    if events.send(HealthEvent::from_probe(index, status)).await.is_err() {
                        break;
                    }
                }
                _ = shutdown.recv() => {
                    tracing::debug!(upstream = %endpoint, "Health prober received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    /// Probe one upstream; `None` means no response arrived.
    async fn probe(&self, endpoint: &Url) -> Option<u16> {
        let uri = match self.settings.path
            .parse::<Uri>()
            .map_err(axum::http::Error::from)
            .and_then(|path| upstream_uri(endpoint, &path))
        {
            Ok(uri) => uri,
            Err(e) => {
                tracing::error!(upstream = %endpoint, error = %e, "Failed to build health check URI");
                return None;
            }
        };

        let request = match Request::builder()
            .method("GET")
            .uri(uri)
            .header("user-agent", "tinylb-health-check")
            .body(Body::empty()) {
                Ok(req) => req,
                Err(e) => {
                    tracing::error!("Failed to build health check request: {}", e);
                    return None;
                }
            };

        match time::timeout(self.settings.timeout, self.client.request(request)).await {
            Ok(Ok(response)) => {
                let status = response.status();
                if status.is_server_error() {
                    tracing::warn!(upstream = %endpoint, status = %status, "Health check failed: server error status");
                }
                Some(status.as_u16())
            }
            Ok(Err(e)) => {
                tracing::warn!(upstream = %endpoint, error = %e, "Health check failed: connection error");
                None
            }
            Err(_) => {
                tracing::warn!(upstream = %endpoint, "Health check failed: timeout");
                None
            }
        }
    }
}

/// Drain probe results into the pool until every prober has stopped.
pub async fn apply_events(pool: Arc<ServerPool>, mut events: mpsc::Receiver<HealthEvent>) {
    while let Some(event) = events.recv().await {
        let changed = pool.apply(event);
        let Some(upstream) = pool.upstreams().get(event.index) else {
            continue;
        };

        if changed {
            if event.status.is_up() {
                tracing::info!(upstream = %upstream.endpoint(), "Upstream is healthy again");
            } else {
                tracing::warn!(upstream = %upstream.endpoint(), "Upstream is not healthy");
            }
        }
        metrics::record_upstream_health(upstream.endpoint().as_str(), upstream.is_healthy());
    }
    tracing::info!("Health monitor stopped");
}
