//! Stratus Core - Types and Contracts
//!
//! Pure data types and injection seams for the Stratus cache. The cache
//! implementation lives in `stratus-cache`; this crate contains ONLY the
//! contracts it is built against:
//!
//! - [`Timestamp`] and the injectable [`Clock`] time source
//! - [`CachePolicy`], the TTL / stale-window bundle with named presets
//! - [`CacheError`] and the [`CacheResult`] alias
//! - [`RevalidationErrorSink`], the side-channel for background failures

use chrono::{DateTime, Utc};

pub mod clock;
pub mod error;
pub mod policy;
pub mod sink;

pub use clock::{Clock, SystemClock};
pub use error::{CacheError, CacheResult, FetchError};
pub use policy::CachePolicy;
pub use sink::RevalidationErrorSink;

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;
