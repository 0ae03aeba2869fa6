//! Round-robin load balancing strategy.

use std::sync::Arc;
use crate::load_balancer::{LoadBalancer, next_healthy, upstream::Upstream};

/// Round-robin selector.
/// Rotates the pool cursor through the upstreams, skipping unhealthy ones.
#[derive(Debug, Default)]
pub struct RoundRobin;

impl RoundRobin {
    pub fn new() -> Self {
        Self
    }
}

impl LoadBalancer for RoundRobin {
    fn next_server(
        &self,
        upstreams: &[Arc<Upstream>],
        cursor: &mut usize,
        _client: &str,
    ) -> Option<Arc<Upstream>> {
        if upstreams.is_empty() {
            return None;
        }

        let len = upstreams.len();
        let start = *cursor % len;
        let Some(index) = next_healthy(upstreams, start) else {
            // A failed scan still advanced the cursor len-1 times
            *cursor = (start + len - 1) % len;
            return None;
        };

        // Leave the cursor one past the chosen upstream
        *cursor = (index + 1) % len;
        Some(upstreams[index].clone())
    }
}
