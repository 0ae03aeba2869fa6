//! Least Response Time load balancing strategy.

use std::sync::Arc;
use crate::load_balancer::{LoadBalancer, upstream::Upstream};

/// Selects the healthy upstream with the lowest average response time.
///
/// An upstream with no recorded requests wins immediately, so fresh or revived
/// upstreams get sampled before their average is trusted.
#[derive(Debug, Default)]
pub struct LeastResponseTime;

impl LeastResponseTime {
    pub fn new() -> Self {
        Self
    }
}

impl LoadBalancer for LeastResponseTime {
    fn next_server(
        &self,
        upstreams: &[Arc<Upstream>],
        _cursor: &mut usize,
        _client: &str,
    ) -> Option<Arc<Upstream>> {
        let mut best: Option<(&Arc<Upstream>, _)> = None;

        for upstream in upstreams.iter().filter(|u| u.is_healthy()) {
            let Some(average) = upstream.average_response_time() else {
                return Some(upstream.clone());
            };
            match best {
                Some((_, lowest)) if average >= lowest => {}
                _ => best = Some((upstream, average)),
            }
        }

        best.map(|(upstream, _)| upstream.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::load_balancer::test_support::{index_of, upstreams};
    use std::time::Duration;

    fn sample(upstream: &Upstream, millis: &[u64]) {
        for &ms in millis {
            upstream.record_completion(Duration::from_millis(ms));
        }
    }

    #[test]
    fn picks_lowest_average() {
        let lb = LeastResponseTime::new();
        let pool = upstreams(&[1, 1, 1]);
        sample(&pool[0], &[300, 100]);
        sample(&pool[1], &[50, 70]);
        sample(&pool[2], &[80]);
        let mut cursor = 0;

        let chosen = lb.next_server(&pool, &mut cursor, "").unwrap();
        assert_eq!(index_of(&pool, &chosen), 1);
    }

    #[test]
    fn unsampled_upstream_wins() {
        let lb = LeastResponseTime::new();
        let pool = upstreams(&[1, 1, 1]);
        sample(&pool[0], &[1]);
        sample(&pool[2], &[1]);
        let mut cursor = 0;

        let chosen = lb.next_server(&pool, &mut cursor, "").unwrap();
        assert_eq!(index_of(&pool, &chosen), 1);
    }

    #[test]
    fn ties_go_to_first_seen() {
        let lb = LeastResponseTime::new();
        let pool = upstreams(&[1, 1, 1]);
        sample(&pool[0], &[90]);
        sample(&pool[1], &[40, 60]);
        sample(&pool[2], &[50]);
        let mut cursor = 0;

        let chosen = lb.next_server(&pool, &mut cursor, "").unwrap();
        assert_eq!(index_of(&pool, &chosen), 1);
    }

    #[test]
    fn unhealthy_unsampled_is_skipped() {
        let lb = LeastResponseTime::new();
        let pool = upstreams(&[1, 1]);
        pool[0].mark_dead();
        sample(&pool[1], &[20]);
        let mut cursor = 0;

        let chosen = lb.next_server(&pool, &mut cursor, "").unwrap();
        assert_eq!(index_of(&pool, &chosen), 1);
    }
}
