//! Structured logging.
//!
//! # Responsibilities
//! - Initialize logging subsystem
//! - Configure log level from environment or config
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - JSON format for production, pretty format for development
//! - `RUST_LOG` wins over the configured level
//! - An optional log directory gets a second, always-JSON copy of every event

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{LogFormat, ObservabilityConfig};

/// Build the filter: `RUST_LOG` if set, else the configured level for this
/// crate and the HTTP middleware.
pub fn env_filter(config: &ObservabilityConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("tinylb={level},tower_http={level}", level = config.log_level).into()
    })
}

/// Create `dir` if needed and open a fresh `loadbalancer-<unix secs>.log` in it.
pub fn open_log_file(dir: &Path) -> io::Result<(File, PathBuf)> {
    fs::create_dir_all(dir)?;
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();
    let path = dir.join(format!("loadbalancer-{}.log", timestamp));
    let file = OpenOptions::new().create(true).append(true).open(&path)?;
    Ok((file, path))
}

/// Install the global subscriber. Returns the log file path when `log_dir` is set.
pub fn init(config: &ObservabilityConfig) -> io::Result<Option<PathBuf>> {
    let (file_layer, path) = match &config.log_dir {
        Some(dir) => {
            let (file, path) = open_log_file(Path::new(dir))?;
            let layer = tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_writer(Mutex::new(file));
            (Some(layer), Some(path))
        }
        None => (None, None),
    };

    let registry = tracing_subscriber::registry()
        .with(env_filter(config))
        .with(file_layer);

    match config.log_format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_current_span(false))
            .init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn log_file_lands_in_created_directory() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("log");

        let (mut file, path) = open_log_file(&dir).unwrap();
        writeln!(file, "{{\"level\":\"INFO\"}}").unwrap();

        assert_eq!(path.parent(), Some(dir.as_path()));
        let name = path.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("loadbalancer-") && name.ends_with(".log"), "{name}");
        assert!(fs::read_to_string(&path).unwrap().contains("INFO"));
    }

    #[test]
    fn filter_falls_back_to_configured_level() {
        let config = ObservabilityConfig {
            log_level: "debug".to_string(),
            ..Default::default()
        };
        if std::env::var_os("RUST_LOG").is_none() {
            let filter = env_filter(&config).to_string();
            assert!(filter.contains("tinylb=debug"), "{filter}");
        }
    }
}
