//! Weighted round-robin load balancing strategy.

use std::sync::Arc;
use crate::load_balancer::{LoadBalancer, next_healthy, upstream::Upstream};

/// Countdown-based Weighted Round Robin (WRR).
///
/// Every upstream carries a `current_weight` countdown that starts at its
/// configured weight. The cursor walks the pool like plain round-robin but
/// skips upstreams whose countdown is spent; each pick spends one unit. Once
/// every healthy countdown is spent, all countdowns are replenished and the
/// cycle starts over. With weights 5, 3 and 2 one cycle is
/// `[A, B, C, A, B, C, A, B, A, A]`.
///
/// Replenishing restores the countdown of unhealthy upstreams as well. An
/// upstream that recovers mid-cycle therefore rejoins with a full countdown,
/// which skews the healthy-only distribution of that cycle.
#[derive(Debug, Default)]
pub struct WeightedRoundRobin;

impl WeightedRoundRobin {
    pub fn new() -> Self {
        Self
    }

    fn replenish_all(upstreams: &[Arc<Upstream>]) {
        for upstream in upstreams {
            upstream.replenish();
        }
    }
}

fn eligible(upstream: &Upstream) -> bool {
    upstream.is_healthy() && upstream.current_weight() > 0
}

impl LoadBalancer for WeightedRoundRobin {
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
        let mut index = *cursor % len;

        if !eligible(&upstreams[index]) {
            let mut healthy_seen = usize::from(upstreams[index].is_healthy());
            for _ in 1..len {
                index = (index + 1) % len;
                if upstreams[index].is_healthy() {
                    healthy_seen += 1;
                }
                if eligible(&upstreams[index]) {
                    break;
                }
            }

            if healthy_seen == 0 {
                *cursor = index;
                return None;
            }

            if upstreams[index].current_weight() == 0 || !upstreams[index].is_healthy() {
                tracing::trace!("Weighted round-robin cycle complete, replenishing weights");
                Self::replenish_all(upstreams);
                // The scan may end past the last healthy upstream
                index = next_healthy(upstreams, index)?;
            }
        }

        let chosen = &upstreams[index];
        chosen.consume_weight();
        *cursor = (index + 1) % len;
        Some(chosen.clone())
    }
}
