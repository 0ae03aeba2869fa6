//! Configuration loading from disk.

use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::config::schema::BalancerConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a file.
///
/// `.json` files are read as JSON, anything else as TOML.
pub fn load_config(path: &Path) -> Result<BalancerConfig, ConfigError> {
    let content = fs::read_to_string(path)?;

    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    let mut config: BalancerConfig = if is_json {
        serde_json::from_str(&content)?
    } else {
        toml::from_str(&content)?
    };
    config.normalize();

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}
