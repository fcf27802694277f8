//! Cache entries and freshness classification.

use std::time::Duration;

use chrono::{DateTime, Utc};
use stratus_core::{CachePolicy, Timestamp};

/// A stored value with its freshness bounds.
///
/// The bounds are computed once, when the entry is stored:
/// `fetched_at <= fresh_until <= stale_until` holds by construction, since
/// both durations in the policy are unsigned.
#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    value: T,
    fetched_at: Timestamp,
    fresh_until: Timestamp,
    stale_until: Timestamp,
}

impl<T> CacheEntry<T> {
    /// Build an entry stored at `fetched_at` under `policy`.
    pub fn new(value: T, fetched_at: Timestamp, policy: CachePolicy) -> Self {
        let fresh_until = saturating_add(fetched_at, policy.ttl);
        let stale_until = saturating_add(fresh_until, policy.stale_window);
        Self {
            value,
            fetched_at,
            fresh_until,
            stale_until,
        }
    }

    /// The cached value.
    pub fn value(&self) -> &T {
        &self.value
    }

    /// When the value was stored.
    pub fn fetched_at(&self) -> Timestamp {
        self.fetched_at
    }

    /// End of the fresh period.
    pub fn fresh_until(&self) -> Timestamp {
        self.fresh_until
    }

    /// End of the stale grace period.
    pub fn stale_until(&self) -> Timestamp {
        self.stale_until
    }

    /// Age of the entry at `now`; zero if the clock moved backwards.
    pub fn age(&self, now: Timestamp) -> Duration {
        now.signed_duration_since(self.fetched_at)
            .to_std()
            .unwrap_or(Duration::ZERO)
    }

    /// True while the entry may be served without any fetch activity.
    pub fn is_fresh(&self, now: Timestamp) -> bool {
        now < self.fresh_until
    }

    /// True while the entry may still be served at all, fresh or stale.
    pub fn is_servable(&self, now: Timestamp) -> bool {
        now < self.stale_until
    }
}

impl<T: Clone> CacheEntry<T> {
    /// Classify this entry against `now`, cloning the value out for the
    /// servable states. Past `stale_until` the entry must not be served and
    /// classifies as [`CacheState::Missing`] even though it is physically
    /// still present.
    pub fn classify(&self, now: Timestamp) -> CacheState<T> {
        if now < self.fresh_until {
            CacheState::Fresh(self.value.clone())
        } else if now < self.stale_until {
            CacheState::Stale(self.value.clone())
        } else {
            CacheState::Missing
        }
    }
}

/// Result of classifying a key against the clock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheState<T> {
    /// Entry age is under the TTL; served directly, no fetch activity.
    Fresh(T),
    /// Past the TTL but inside the stale window; served immediately while
    /// at most one background refresh runs.
    Stale(T),
    /// No entry, or the entry aged past its stale window; the caller must
    /// await a fetch.
    Missing,
}

impl<T> CacheState<T> {
    /// True for [`CacheState::Fresh`].
    pub fn is_fresh(&self) -> bool {
        matches!(self, Self::Fresh(_))
    }

    /// True for [`CacheState::Stale`].
    pub fn is_stale(&self) -> bool {
        matches!(self, Self::Stale(_))
    }

    /// True for [`CacheState::Missing`].
    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing)
    }

    /// The servable value, if any.
    pub fn value(&self) -> Option<&T> {
        match self {
            Self::Fresh(value) | Self::Stale(value) => Some(value),
            Self::Missing => None,
        }
    }

    /// Consume the state and return the servable value, if any.
    pub fn into_value(self) -> Option<T> {
        match self {
            Self::Fresh(value) | Self::Stale(value) => Some(value),
            Self::Missing => None,
        }
    }
}

/// Add an unsigned duration to a timestamp, clamping instead of panicking
/// on overflow (e.g. a policy with an absurdly large window).
fn saturating_add(ts: Timestamp, d: Duration) -> Timestamp {
    chrono::Duration::from_std(d)
        .ok()
        .and_then(|d| ts.checked_add_signed(d))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}
