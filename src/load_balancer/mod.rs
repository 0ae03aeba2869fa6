//! Load balancing subsystem.
//!
//! # Data Flow
//! ```text
//! Request dispatched
//!     → pool.rs (take the pool lock)
//!     → Apply the configured strategy:
//!         - round_robin.rs (rotate through upstreams)
//!         - random.rs (uniform pick among healthy)
//!         - weighted.rs (countdown-based weighted rotation)
//!         - ip_hash.rs (FNV-1a of the client identifier)
//!         - least_conn.rs (fewest in-flight requests)
//!         - least_time.rs (lowest average response time)
//!     → Return an upstream or `SelectError::NoHealthyUpstream`
//! ```
//!
//! # Design Decisions
//! - The strategy set is closed; `Strategy` resolves to one fixed implementation
//! - Strategies own no state; the rotation cursor lives in the pool
//! - Unhealthy upstreams are never selected

pub mod ip_hash;
pub mod least_conn;
pub mod least_time;
pub mod pool;
pub mod random;
pub mod round_robin;
pub mod upstream;
pub mod weighted;

use std::fmt;
use std::sync::Arc;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use pool::ServerPool;
pub use upstream::Upstream;

/// A selection algorithm over the pool's upstreams.
///
/// Called with the pool lock held; `cursor` is the pool's shared rotation index
/// and is always in `0..upstreams.len()` when `upstreams` is non-empty.
pub trait LoadBalancer: Send + Sync + fmt::Debug {
    /// Pick the upstream for the next request, or `None` if no healthy one exists.
    fn next_server(
        &self,
        upstreams: &[Arc<Upstream>],
        cursor: &mut usize,
        client: &str,
    ) -> Option<Arc<Upstream>>;
}

/// Error returned when no upstream can take the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SelectError {
    #[error("no healthy upstream available")]
    NoHealthyUpstream,
}

/// Configured selection strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    #[default]
    RoundRobin,
    Random,
    WeightedRoundRobin,
    IpHashing,
    LeastConnections,
    LeastResponseTime,
}

impl Strategy {
    pub const ALL: [Strategy; 6] = [
        Strategy::RoundRobin,
        Strategy::Random,
        Strategy::WeightedRoundRobin,
        Strategy::IpHashing,
        Strategy::LeastConnections,
        Strategy::LeastResponseTime,
    ];

    /// Name used in configuration files.
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::RoundRobin => "round-robin",
            Strategy::Random => "random",
            Strategy::WeightedRoundRobin => "weighted-round-robin",
            Strategy::IpHashing => "ip-hashing",
            Strategy::LeastConnections => "least-connections",
            Strategy::LeastResponseTime => "least-response-time",
        }
    }

    /// Build the implementation for this strategy.
    pub fn balancer(&self) -> Box<dyn LoadBalancer> {
        match self {
            Strategy::RoundRobin => Box::new(round_robin::RoundRobin::new()),
            Strategy::Random => Box::new(random::Random::new()),
            Strategy::WeightedRoundRobin => Box::new(weighted::WeightedRoundRobin::new()),
            Strategy::IpHashing => Box::new(ip_hash::IpHash::new()),
            Strategy::LeastConnections => Box::new(least_conn::LeastConnections::new()),
            Strategy::LeastResponseTime => Box::new(least_time::LeastResponseTime::new()),
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Index of the first healthy upstream at or after `start`, wrapping, looking
/// at most `upstreams.len()` records.
pub(crate) fn next_healthy(upstreams: &[Arc<Upstream>], start: usize) -> Option<usize> {
    let len = upstreams.len();
    (0..len)
        .map(|step| (start + step) % len)
        .find(|&index| upstreams[index].is_healthy())
}
