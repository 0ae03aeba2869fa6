//! Server pool management.
//!
//! # Responsibilities
//! - Own the ordered upstream records and the rotation cursor
//! - Serialize every selection decision behind the pool lock
//! - Apply health transitions published by the health monitor
//!
//! # Locking
//! The pool lock is the cursor mutex and is held for a whole strategy call.
//! Strategies read record fields through the per-record lock, one field at a
//! time, so a concurrent `mark_dead` or health event can interleave between two
//! reads of the same decision. Selections may act on a slightly stale view; they
//! never observe a torn field.

use std::sync::{Arc, Mutex};
use url::Url;

use crate::health::state::{HealthEvent, HealthStatus};
use crate::load_balancer::{LoadBalancer, SelectError, Strategy, upstream::Upstream};

/// Ordered set of upstreams plus shared selection state.
#[derive(Debug)]
pub struct ServerPool {
    upstreams: Vec<Arc<Upstream>>,
    /// Rotation cursor; this mutex is the pool-wide lock.
    cursor: Mutex<usize>,
    strategy: Strategy,
    balancer: Box<dyn LoadBalancer>,
}

impl ServerPool {
    /// Create a pool from ordered `(endpoint, weight)` pairs.
    pub fn new<I>(upstreams: I, strategy: Strategy) -> Self
    where
        I: IntoIterator<Item = (Url, u32)>,
    {
        let upstreams = upstreams
            .into_iter()
            .map(|(endpoint, weight)| Arc::new(Upstream::new(endpoint, weight)))
            .collect();

        Self {
            upstreams,
            cursor: Mutex::new(0),
            strategy,
            balancer: strategy.balancer(),
        }
    }

    /// Select an upstream for a request from `client`.
    pub fn select(&self, client: &str) -> Result<Arc<Upstream>, SelectError> {
        let mut cursor = self.cursor.lock().expect("pool cursor mutex poisoned");

        match self.balancer.next_server(&self.upstreams, &mut cursor, client) {
            Some(upstream) => {
                tracing::debug!(
                    strategy = %self.strategy,
                    upstream = %upstream.endpoint(),
                    cursor = *cursor,
                    "Upstream selected"
                );
                Ok(upstream)
            }
            None => {
                tracing::debug!(strategy = %self.strategy, upstream_count = self.upstreams.len(), "No healthy upstreams in pool");
                for u in &self.upstreams {
                    tracing::trace!(upstream = %u.endpoint(), state = ?u.snapshot(), "Upstream status");
                }
                Err(SelectError::NoHealthyUpstream)
            }
        }
    }

    /// Apply a health transition. Returns `true` if the upstream's health flag
    /// changed.
    pub fn apply(&self, event: HealthEvent) -> bool {
        let Some(upstream) = self.upstreams.get(event.index) else {
            tracing::warn!(index = event.index, "Health event for unknown upstream");
            return false;
        };

        let was_healthy = upstream.is_healthy();
        match event.status {
            HealthStatus::Up => upstream.mark_healthy(),
            HealthStatus::Down => upstream.set_unhealthy(),
        }
        was_healthy != event.status.is_up()
    }

    /// All upstreams in pool order.
    pub fn upstreams(&self) -> &[Arc<Upstream>] {
        &self.upstreams
    }

    pub fn len(&self) -> usize {
        self.upstreams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.upstreams.is_empty()
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    /// Current cursor position.
    pub fn cursor(&self) -> usize {
        *self.cursor.lock().expect("pool cursor mutex poisoned")
    }
}
