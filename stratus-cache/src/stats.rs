//! Cache statistics.

use std::sync::atomic::{AtomicU64, Ordering};

/// Point-in-time snapshot of cache state and read counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Entries physically present, including aged-out ones not yet
    /// overwritten or invalidated.
    pub entries: usize,
    /// Foreground fetches currently outstanding.
    pub pending_fetches: usize,
    /// Background revalidations currently in flight.
    pub revalidating: usize,
    /// All keys currently present, sorted.
    pub keys: Vec<String>,
    /// Reads served from a fresh entry.
    pub fresh_hits: u64,
    /// Reads served from a stale entry while a refresh ran behind them.
    pub stale_hits: u64,
    /// Reads that had to await a fetch.
    pub misses: u64,
    /// Background refreshes that completed and stored a value.
    pub refreshes: u64,
    /// Background refreshes that failed and left the old entry in place.
    pub refresh_failures: u64,
}

impl CacheStats {
    /// Share of reads served without awaiting a fetch (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let hits = self.fresh_hits + self.stale_hits;
        let total = hits + self.misses;
        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }
}

/// Monotonic read counters shared by every handle of one cache.
///
/// Kept as atomics outside the store lock; a read increments exactly one of
/// the hit/miss counters.
#[derive(Debug, Default)]
pub(crate) struct StatsCounters {
    fresh_hits: AtomicU64,
    stale_hits: AtomicU64,
    misses: AtomicU64,
    refreshes: AtomicU64,
    refresh_failures: AtomicU64,
}

impl StatsCounters {
    pub(crate) fn record_fresh_hit(&self) {
        self.fresh_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_stale_hit(&self) {
        self.stale_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_refresh(&self) {
        self.refreshes.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_refresh_failure(&self) {
        self.refresh_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn fresh_hits(&self) -> u64 {
        self.fresh_hits.load(Ordering::Relaxed)
    }

    pub(crate) fn stale_hits(&self) -> u64 {
        self.stale_hits.load(Ordering::Relaxed)
    }

    pub(crate) fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    pub(crate) fn refreshes(&self) -> u64 {
        self.refreshes.load(Ordering::Relaxed)
    }

    pub(crate) fn refresh_failures(&self) -> u64 {
        self.refresh_failures.load(Ordering::Relaxed)
    }
}
