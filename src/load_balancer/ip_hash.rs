//! IP hashing load balancing strategy.
//!
//! # Design Decisions
//! - 32-bit FNV-1a over the client identifier bytes
//! - Failover walks forward in pool order, so a displaced client lands on a
//!   predictable upstream
//! - The rotation cursor is never touched

use std::sync::Arc;
use crate::load_balancer::{LoadBalancer, next_healthy, upstream::Upstream};

const FNV_OFFSET_BASIS: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;

/// 32-bit FNV-1a hash.
pub fn fnv1a_32(bytes: &[u8]) -> u32 {
    bytes.iter().fold(FNV_OFFSET_BASIS, |hash, &byte| {
        (hash ^ u32::from(byte)).wrapping_mul(FNV_PRIME)
    })
}

/// Sticky selector keyed by the client identifier.
#[derive(Debug, Default)]
pub struct IpHash;

impl IpHash {
    pub fn new() -> Self {
        Self
    }

    /// Index the client maps to while every upstream is healthy.
    pub fn home_index(client: &str, len: usize) -> usize {
        fnv1a_32(client.as_bytes()) as usize % len
    }
}

impl LoadBalancer for IpHash {
    fn next_server(
        &self,
        upstreams: &[Arc<Upstream>],
        _cursor: &mut usize,
        client: &str,
    ) -> Option<Arc<Upstream>> {
        if upstreams.is_empty() {
            return None;
        }

        let home = Self::home_index(client, upstreams.len());
        let index = next_healthy(upstreams, home)?;
        tracing::trace!(client = %client, home, index, "IP hash resolved");
        Some(upstreams[index].clone())
    }
}
