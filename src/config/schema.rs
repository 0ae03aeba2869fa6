//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the balancer.
//! All types derive Serde traits for deserialization from config files.

use std::time::Duration;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::load_balancer::Strategy;

/// Root configuration for the load balancer.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct BalancerConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Upstream servers, in rotation order.
    #[serde(alias = "upstreams")]
    pub servers: Vec<UpstreamConfig>,

    /// Selection strategy.
    pub strategy: Strategy,

    /// Try the next upstream when one answers with a 5xx.
    #[serde(alias = "retryRequests")]
    pub retry_requests: bool,

    /// Health check settings.
    pub health_check: HealthCheckConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Legacy flat listen port; folded into `listener` by the loader.
    #[serde(skip_serializing)]
    pub port: Option<u16>,

    /// Legacy flat health check interval; folded into `health_check` by the loader.
    #[serde(alias = "healthCheckInterval", skip_serializing)]
    pub health_check_interval: Option<String>,
}

impl BalancerConfig {
    /// Move legacy flat keys into their sections.
    pub fn normalize(&mut self) {
        if let Some(port) = self.port.take() {
            self.listener.bind_address = format!("0.0.0.0:{}", port);
        }
        if let Some(interval) = self.health_check_interval.take() {
            self.health_check.interval = interval;
        }
    }

    /// Ordered `(endpoint, weight)` pairs for the server pool.
    pub fn upstreams(&self) -> Vec<(Url, u32)> {
        self.servers
            .iter()
            .filter_map(|server| match Url::parse(&server.url) {
                Ok(url) => Some((url, server.weight)),
                Err(e) => {
                    tracing::warn!(url = %server.url, error = %e, "Invalid upstream URL, skipping");
                    None
                }
            })
            .collect()
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Upstream server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UpstreamConfig {
    /// Base URL (e.g., "http://127.0.0.1:3000").
    pub url: String,

    /// Weight for weighted round-robin (default: 1).
    #[serde(default = "default_weight")]
    pub weight: u32,
}

fn default_weight() -> u32 {
    1
}

/// Health check configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HealthCheckConfig {
    /// Enable active health checks.
    pub enabled: bool,

    /// Probe interval, humantime format ("5s", "1m30s").
    pub interval: String,

    /// Probe timeout, humantime format.
    pub timeout: String,

    /// Path to probe on each upstream.
    pub path: String,
}

impl HealthCheckConfig {
    pub fn interval(&self) -> Result<Duration, humantime::DurationError> {
        humantime::parse_duration(self.interval.trim())
    }

    pub fn timeout(&self) -> Result<Duration, humantime::DurationError> {
        humantime::parse_duration(self.timeout.trim())
    }
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval: "5s".to_string(),
            timeout: "2s".to_string(),
            path: "/health".to_string(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Also write JSON logs to `<log_dir>/loadbalancer-<unix secs>.log`.
    pub log_dir: Option<String>,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            log_dir: None,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
