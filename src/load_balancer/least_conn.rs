//! Least Connections load balancing strategy.

use std::sync::Arc;
use crate::load_balancer::{LoadBalancer, upstream::Upstream};

/// Least connections selector.
/// Selects the healthy upstream with the minimum number of in-flight requests.
#[derive(Debug, Default)]
pub struct LeastConnections;

impl LeastConnections {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LoadBalancer for LeastConnections {
    fn next_server(
        &self,
        upstreams: &[Arc<Upstream>],
        _cursor: &mut usize,
        _client: &str,
    ) -> Option<Arc<Upstream>> {
        // `min_by_key` keeps the first minimum, so ties go to pool order
        upstreams
            .iter()
            .filter(|u| u.is_healthy())
            .min_by_key(|u| u.active_connections())
            .cloned()
    }
}
