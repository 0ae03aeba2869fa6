//! Upstream health transitions.
//!
//! # States
//! - Up: upstream receives traffic
//! - Down: upstream excluded from load balancing
//!
//! # State Transitions
//! ```text
//! Up → Down: probe error, probe timeout, or probe status >= 500
//! Down → Up: probe answered with status < 500
//! ```
//!
//! # Design Decisions
//! - Probers only publish events; the pool applies them
//! - A single probe result flips the state, no hysteresis
//! - A Down event only clears the health flag. Counters are reset only by the
//!   dispatch path after a failed request.

/// Result of one health probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthStatus {
    Up,
    Down,
}

impl HealthStatus {
    pub fn is_up(&self) -> bool {
        matches!(self, HealthStatus::Up)
    }
}

/// Health transition for the upstream at `index` in pool order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthEvent {
    pub index: usize,
    pub status: HealthStatus,
}

impl HealthEvent {
    pub fn up(index: usize) -> Self {
        Self { index, status: HealthStatus::Up }
    }

    pub fn down(index: usize) -> Self {
        Self { index, status: HealthStatus::Down }
    }

    /// Classify a probe outcome: any response below 500 counts as up.
    pub fn from_probe(index: usize, status: Option<u16>) -> Self {
        match status {
            Some(code) if code < 500 => Self::up(index),
            _ => Self::down(index),
        }
    }
}
