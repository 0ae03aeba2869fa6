//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, or legacy JSON)
//!     → loader.rs (parse & deserialize, fold legacy keys)
//!     → validation.rs (semantic checks)
//!     → BalancerConfig (validated, immutable)
//!     → consumed once at startup to build the pool and listener
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; the upstream set is fixed for the process
//! - All fields have defaults to allow minimal configs
//! - Unknown strategy names fail deserialization, so a bad strategy never
//!   reaches the pool
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::BalancerConfig;
pub use schema::HealthCheckConfig;
pub use schema::ListenerConfig;
pub use schema::LogFormat;
pub use schema::ObservabilityConfig;
pub use schema::UpstreamConfig;
