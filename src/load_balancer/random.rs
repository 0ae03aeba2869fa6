//! Random load balancing strategy.

use std::sync::Arc;
use rand::seq::SliceRandom;
use crate::load_balancer::{LoadBalancer, upstream::Upstream};

/// Uniform random selector over the healthy upstreams.
#[derive(Debug, Default)]
pub struct Random;

impl Random {
    pub fn new() -> Self {
        Self
    }
}

impl LoadBalancer for Random {
    fn next_server(
        &self,
        upstreams: &[Arc<Upstream>],
        _cursor: &mut usize,
        _client: &str,
    ) -> Option<Arc<Upstream>> {
        let healthy: Vec<&Arc<Upstream>> = upstreams.iter().filter(|u| u.is_healthy()).collect();
        healthy.choose(&mut rand::thread_rng()).map(|&u| Arc::clone(u))
    }
}
