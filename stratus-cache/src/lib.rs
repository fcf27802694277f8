//! Stale-while-revalidate caching with request deduplication.
//!
//! This crate implements an in-process cache manager for the read path of
//! API-backed applications: values are fetched once, served fresh for a
//! TTL, served stale for a grace window while a single background refresh
//! runs, and re-fetched (deduplicated across concurrent callers) once they
//! age out entirely.
//!
//! # Design Philosophy
//!
//! Most caches hide their freshness decisions. This one makes them
//! explicit: every entry carries its fresh and stale bounds, [`classify`]
//! is a pure read any caller can make, and the three coordination maps
//! (store, in-flight fetches, revalidating keys) are owned by one
//! instantiable handle rather than module-level state, so independent
//! caches can coexist and tests can drive time through an injected clock.
//!
//! [`classify`]: SwrCache::classify
//!
//! # Guarantees
//!
//! - For any key, at most one concurrent fetcher invocation due to a
//!   missing or aged-out entry, no matter how many callers race.
//! - For any key, at most one background revalidation in flight; bursts of
//!   stale reads elect exactly one refresher.
//! - A stale read never fails: background fetch errors go to an injected
//!   sink, and the previous value stays servable until it fully expires.
//!
//! # Example
//!
//! ```ignore
//! use stratus_cache::{CachePolicy, SwrCache};
//!
//! let cache: SwrCache<Profile> = SwrCache::with_policy(CachePolicy::realtime());
//!
//! let profile = cache
//!     .get("profile:42", || async { api.load_profile(42).await })
//!     .await?;
//! ```

pub mod cache;
pub mod entry;
pub mod key;
pub mod revalidate;
pub mod stats;
pub mod store;

mod flight;

pub use cache::SwrCache;
pub use entry::{CacheEntry, CacheState};
pub use key::query_key;
pub use revalidate::TracingErrorSink;
pub use stats::CacheStats;
pub use store::CacheStore;

// Re-export the core contracts so consumers need a single import.
pub use stratus_core::{
    CacheError, CachePolicy, CacheResult, Clock, FetchError, RevalidationErrorSink, SystemClock,
    Timestamp,
};
