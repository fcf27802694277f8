//! Stratus Test Utilities
//!
//! Centralized test infrastructure for the Stratus workspace:
//! - [`MockClock`], a manually advanced time source
//! - [`CountingFetcher`] and [`FailingFetcher`], instrumented fetchers
//! - [`RecordingErrorSink`], capturing background revalidation failures
//! - [`settle`], an async helper that yields until detached work lands
//! - Proptest strategies for cache policies

use std::future;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::TimeZone;
use chrono::Utc;
use proptest::prelude::*;

use stratus_core::{CacheError, Clock, FetchError, RevalidationErrorSink, Timestamp};

// Re-export core types for convenience
pub use stratus_core::{CachePolicy, CacheResult, SystemClock};

/// A fixed, arbitrary instant used as the origin of mock time.
pub fn epoch() -> Timestamp {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

// ============================================================================
// MOCK CLOCK
// ============================================================================

/// Manually advanced clock for deterministic freshness tests.
///
/// Clones share the same instant: hand one clone to the cache and keep the
/// other to drive time from the test.
#[derive(Debug, Clone)]
pub struct MockClock {
    now: Arc<Mutex<Timestamp>>,
}

impl MockClock {
    /// Clock starting at [`epoch`].
    pub fn new() -> Self {
        Self::starting_at(epoch())
    }

    /// Clock starting at an explicit instant.
    pub fn starting_at(now: Timestamp) -> Self {
        Self {
            now: Arc::new(Mutex::new(now)),
        }
    }

    /// Move the clock forward.
    pub fn advance(&self, by: Duration) {
        let delta = chrono::Duration::from_std(by).expect("advance duration out of range");
        let mut now = self.now.lock().unwrap();
        *now = *now + delta;
    }

    /// Jump the clock to an absolute instant.
    pub fn set(&self, to: Timestamp) {
        *self.now.lock().unwrap() = to;
    }
}

impl Default for MockClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MockClock {
    fn now(&self) -> Timestamp {
        *self.now.lock().unwrap()
    }
}

// ============================================================================
// INSTRUMENTED FETCHERS
// ============================================================================

/// Fetcher factory that counts invocations and resolves to a canned value.
///
/// Each [`CountingFetcher::fetcher`] call produces one single-use closure
/// suitable for one `get`; the counter is shared across all of them.
#[derive(Debug, Clone)]
pub struct CountingFetcher {
    calls: Arc<AtomicU32>,
    value: String,
}

impl CountingFetcher {
    /// Fetcher resolving to `value` on every invocation.
    pub fn returning(value: impl Into<String>) -> Self {
        Self {
            calls: Arc::new(AtomicU32::new(0)),
            value: value.into(),
        }
    }

    /// How many times a produced closure has been invoked.
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    /// A fetcher closure for one `get` call.
    pub fn fetcher(
        &self,
    ) -> impl FnOnce() -> future::Ready<Result<String, FetchError>> + Send + 'static {
        let calls = Arc::clone(&self.calls);
        let value = self.value.clone();
        move || {
            calls.fetch_add(1, Ordering::SeqCst);
            future::ready(Ok(value))
        }
    }
}

/// Fetcher factory that counts invocations and always rejects.
#[derive(Debug, Clone)]
pub struct FailingFetcher {
    calls: Arc<AtomicU32>,
    reason: String,
}

impl FailingFetcher {
    /// Fetcher rejecting with `reason` on every invocation.
    pub fn rejecting(reason: impl Into<String>) -> Self {
        Self {
            calls: Arc::new(AtomicU32::new(0)),
            reason: reason.into(),
        }
    }

    /// How many times a produced closure has been invoked.
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    /// A fetcher closure for one `get` call.
    pub fn fetcher(
        &self,
    ) -> impl FnOnce() -> future::Ready<Result<String, FetchError>> + Send + 'static {
        let calls = Arc::clone(&self.calls);
        let reason = self.reason.clone();
        move || {
            calls.fetch_add(1, Ordering::SeqCst);
            future::ready(Err(reason.into()))
        }
    }
}

// ============================================================================
// RECORDING ERROR SINK
// ============================================================================

/// Error sink that records every reported background failure.
#[derive(Debug, Clone, Default)]
pub struct RecordingErrorSink {
    reports: Arc<Mutex<Vec<(String, CacheError)>>>,
}

impl RecordingErrorSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All reported failures, in order.
    pub fn reports(&self) -> Vec<(String, CacheError)> {
        self.reports.lock().unwrap().clone()
    }

    /// Number of reported failures.
    pub fn len(&self) -> usize {
        self.reports.lock().unwrap().len()
    }

    /// True when nothing has been reported.
    pub fn is_empty(&self) -> bool {
        self.reports.lock().unwrap().is_empty()
    }
}

impl RevalidationErrorSink for RecordingErrorSink {
    fn revalidation_failed(&self, key: &str, error: &CacheError) {
        self.reports
            .lock()
            .unwrap()
            .push((key.to_owned(), error.clone()));
    }
}

// ============================================================================
// ASYNC SETTLING HELPER
// ============================================================================

/// Yield to the runtime until `pred` holds. Detached work (background
/// revalidations, in-flight fetch settlement) only runs when the test task
/// yields; this bounds the wait instead of sleeping through real time.
///
/// Panics if the condition does not settle within 256 yields.
pub async fn settle(mut pred: impl FnMut() -> bool) {
    for _ in 0..256 {
        if pred() {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("condition did not settle within 256 yields");
}

// ============================================================================
// PROPTEST STRATEGIES
// ============================================================================

/// Strategy producing bounded, well-formed cache policies.
pub fn arb_policy() -> impl Strategy<Value = CachePolicy> {
    (0u64..86_400, 0u64..86_400).prop_map(|(ttl_secs, window_secs)| {
        CachePolicy::new(
            Duration::from_secs(ttl_secs),
            Duration::from_secs(window_secs),
        )
    })
}
