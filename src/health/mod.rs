//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Active health checks (active.rs):
//!     Per-upstream timer
//!     → GET {upstream}{path} under a timeout
//!     → HealthEvent over mpsc
//!
//! Applier (active.rs):
//!     HealthEvent
//!     → ServerPool::apply
//!     → health gauge + transition log
//! ```
//!
//! # Design Decisions
//! - Probers never touch upstream records directly
//! - Health state is per-upstream, not per-pool
//! - The request path marks upstreams dead on its own; probes bring them back

pub mod active;
pub mod state;

pub use active::{HealthMonitor, ProbeSettings};
pub use state::{HealthEvent, HealthStatus};
