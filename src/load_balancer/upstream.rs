//! Upstream record.
//!
//! # Responsibilities
//! - Represent a single upstream server
//! - Track health, weighted round-robin countdown, in-flight connections
//! - Accumulate response timings for Least Response Time
//!
//! All mutable fields sit behind one per-record mutex. Each mutator is a single
//! critical section; only `mark_dead` spans several fields on purpose.

use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use url::Url;

/// Mutable per-upstream state guarded by the record lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamState {
    pub healthy: bool,
    pub current_weight: u32,
    pub active_connections: usize,
    pub request_count: u64,
    pub total_response_time: Duration,
}

/// A single upstream server.
#[derive(Debug)]
pub struct Upstream {
    /// Base URL requests are forwarded to.
    endpoint: Url,
    /// Configured static weight.
    weight: u32,
    state: Mutex<UpstreamState>,
}

impl Upstream {
    /// Create a new upstream. It starts healthy with a full weight countdown.
    pub fn new(endpoint: Url, weight: u32) -> Self {
        Self {
            endpoint,
            weight,
            state: Mutex::new(UpstreamState {
                healthy: true,
                current_weight: weight,
                active_connections: 0,
                request_count: 0,
                total_response_time: Duration::ZERO,
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, UpstreamState> {
        self.state.lock().expect("upstream state mutex poisoned")
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub fn weight(&self) -> u32 {
        self.weight
    }

    /// Copy of all mutable fields taken under one lock acquisition.
    pub fn snapshot(&self) -> UpstreamState {
        self.state().clone()
    }

    pub fn is_healthy(&self) -> bool {
        self.state().healthy
    }

    pub fn current_weight(&self) -> u32 {
        self.state().current_weight
    }

    pub fn active_connections(&self) -> usize {
        self.state().active_connections
    }

    pub fn request_count(&self) -> u64 {
        self.state().request_count
    }

    pub fn total_response_time(&self) -> Duration {
        self.state().total_response_time
    }

    /// Average response time, or `None` while the upstream is unsampled.
    ///
    /// Integer division over whole microseconds.
    pub fn average_response_time(&self) -> Option<Duration> {
        let state = self.state();
        if state.request_count == 0 {
            return None;
        }
        let micros = state.total_response_time.as_micros() / u128::from(state.request_count);
        Some(Duration::from_micros(u64::try_from(micros).unwrap_or(u64::MAX)))
    }

    // --- Dispatch side ---

    /// Increment the in-flight connection count.
    pub fn begin_connection(&self) {
        self.state().active_connections += 1;
    }

    /// Decrement the in-flight connection count.
    ///
    /// Saturates at zero: `mark_dead` may have reset the counter while this
    /// request was in flight.
    pub fn end_connection(&self) {
        let mut state = self.state();
        state.active_connections = state.active_connections.saturating_sub(1);
    }

    /// Account one finished round trip, successful or not.
    pub fn record_completion(&self, elapsed: Duration) {
        let mut state = self.state();
        state.request_count += 1;
        state.total_response_time += elapsed;
    }

    /// Take the upstream out of rotation after an observed request failure and
    /// reset every live counter.
    pub fn mark_dead(&self) {
        let mut state = self.state();
        state.healthy = false;
        state.current_weight = 0;
        state.active_connections = 0;
        state.request_count = 0;
        state.total_response_time = Duration::ZERO;
    }

    // --- Health side ---

    /// Put the upstream back into rotation. Counters are left alone.
    pub fn mark_healthy(&self) {
        self.state().healthy = true;
    }

    /// Take the upstream out of rotation after a failed probe. Unlike
    /// `mark_dead` this does not touch any counter.
    pub fn set_unhealthy(&self) {
        self.state().healthy = false;
    }

    // --- Weighted round-robin ---

    /// Restore the countdown to the configured weight.
    pub fn replenish(&self) {
        self.state().current_weight = self.weight;
    }

    /// Spend one unit of the countdown.
    pub fn consume_weight(&self) {
        let mut state = self.state();
        state.current_weight = state.current_weight.saturating_sub(1);
    }
}
