//! Freshness gate for dynamic cache entries.
//!
//! Dynamic entries carry their write time in a synthetic response header.
//! The gate is only consulted when the network failed; a successful network
//! response is never held back by it.

use std::time::Duration;

use crate::cache::CacheEntry;

/// Synthetic header carrying the write time in ms since epoch.
pub const FETCHED_AT_HEADER: &str = "sw-fetched-at";

/// Result of a freshness check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    Fresh,
    Stale,
}

/// TTL check applied to dynamic entries before they satisfy an offline request.
#[derive(Debug, Clone, Copy)]
pub struct FreshnessGate {
    ttl: Duration,
}

impl FreshnessGate {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Check an entry against `now_ms`.
    ///
    /// A missing or unparsable timestamp reads as zero, so the entry is stale.
    pub fn check(&self, entry: &CacheEntry, now_ms: u64) -> Freshness {
        let fetched_at = entry
            .headers
            .get(FETCHED_AT_HEADER)
            .and_then(|v| v.trim().parse::<u64>().ok())
            .unwrap_or(0);
        self.check_timestamp(fetched_at, now_ms)
    }

    /// Fresh when `now - fetched_at <= ttl`.
    pub fn check_timestamp(&self, fetched_at_ms: u64, now_ms: u64) -> Freshness {
        let age = now_ms.saturating_sub(fetched_at_ms);
        if u128::from(age) <= self.ttl.as_millis() {
            Freshness::Fresh
        } else {
            Freshness::Stale
        }
    }
}
