//! TTL and stale-window policy bundles.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Freshness policy for cached entries.
///
/// An entry stored under a policy is fresh for `ttl`, then servable while a
/// background refresh runs for the following `stale_window`, then expired.
/// A `stale_window` of zero degrades the cache to plain TTL behavior.
///
/// Durations are unsigned, so a policy cannot produce an entry whose stale
/// bound precedes its fresh bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachePolicy {
    /// How long an entry is served without any fetch activity.
    pub ttl: Duration,
    /// Grace period after `ttl` during which the entry is served stale
    /// while at most one background refresh runs.
    pub stale_window: Duration,
}

impl Default for CachePolicy {
    /// Fresh for 30 seconds, servable-while-revalidating for 5 minutes.
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(30),
            stale_window: Duration::from_secs(300),
        }
    }
}

impl CachePolicy {
    /// Create a policy from explicit durations.
    pub const fn new(ttl: Duration, stale_window: Duration) -> Self {
        Self { ttl, stale_window }
    }

    /// Preset for rapidly changing data: fresh 10s, stale window 60s.
    pub const fn realtime() -> Self {
        Self::new(Duration::from_secs(10), Duration::from_secs(60))
    }

    /// Preset for rarely changing data: fresh 1h, stale window 24h.
    pub const fn static_content() -> Self {
        Self::new(Duration::from_secs(3600), Duration::from_secs(86_400))
    }

    /// Set the TTL.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Set the stale window.
    pub fn with_stale_window(mut self, stale_window: Duration) -> Self {
        self.stale_window = stale_window;
        self
    }

    /// Total duration an entry remains servable after being stored.
    pub fn servable_for(&self) -> Duration {
        self.ttl.saturating_add(self.stale_window)
    }
}
