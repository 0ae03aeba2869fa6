//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic, including strategy names)
//! - Validate upstream URLs; only plain http upstreams are supported
//! - Validate durations and socket addresses
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: BalancerConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system
//! - An empty server list is valid; every request is then answered with 503

use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;
use url::Url;

use crate::config::schema::BalancerConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("servers[{index}]: invalid url {url:?}: {reason}")]
    InvalidUpstreamUrl { index: usize, url: String, reason: String },

    #[error("servers[{index}]: unsupported scheme {scheme:?} (expected http)")]
    UnsupportedScheme { index: usize, scheme: String },

    #[error("{field}: invalid duration {value:?}: {reason}")]
    InvalidDuration { field: &'static str, value: String, reason: String },

    #[error("{field}: duration must be greater than zero")]
    ZeroDuration { field: &'static str },

    #[error("{field}: invalid socket address {value:?}")]
    InvalidAddress { field: &'static str, value: String },
}

/// Check a parsed configuration, collecting every problem found.
pub fn validate_config(config: &BalancerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    for (index, server) in config.servers.iter().enumerate() {
        match Url::parse(&server.url) {
            Ok(url) if url.scheme() != "http" => {
                errors.push(ValidationError::UnsupportedScheme {
                    index,
                    scheme: url.scheme().to_string(),
                });
            }
            Ok(_) => {}
            Err(e) => errors.push(ValidationError::InvalidUpstreamUrl {
                index,
                url: server.url.clone(),
                reason: e.to_string(),
            }),
        }
    }

    if config.health_check.enabled {
        check_duration("health_check.interval", &config.health_check.interval, config.health_check.interval(), &mut errors);
        check_duration("health_check.timeout", &config.health_check.timeout, config.health_check.timeout(), &mut errors);
    }

    check_address("listener.bind_address", &config.listener.bind_address, &mut errors);
    if config.observability.metrics_enabled {
        check_address("observability.metrics_address", &config.observability.metrics_address, &mut errors);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_duration(
    field: &'static str,
    value: &str,
    parsed: Result<Duration, humantime::DurationError>,
    errors: &mut Vec<ValidationError>,
) {
    match parsed {
        Ok(d) if d.is_zero() => errors.push(ValidationError::ZeroDuration { field }),
        Ok(_) => {}
        Err(e) => errors.push(ValidationError::InvalidDuration {
            field,
            value: value.to_string(),
            reason: e.to_string(),
        }),
    }
}

fn check_address(field: &'static str, value: &str, errors: &mut Vec<ValidationError>) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field,
            value: value.to_string(),
        });
    }
}
