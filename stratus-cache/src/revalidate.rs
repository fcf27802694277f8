//! Background revalidation bookkeeping.

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};

use tracing::warn;

use stratus_core::{CacheError, RevalidationErrorSink};

/// Set of keys with a background refresh currently in flight.
///
/// [`RevalidatingSet::begin`] is check-and-insert under one lock, so a burst
/// of stale reads for the same key elects exactly one refresher; the rest
/// return their stale value and do nothing. [`RevalidatingSet::finish`] is
/// called unconditionally when the refresh settles, success or failure.
#[derive(Debug, Default)]
pub(crate) struct RevalidatingSet {
    keys: Mutex<HashSet<String>>,
}

impl RevalidatingSet {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Mark `key` as revalidating. Returns false when a refresh for the key
    /// is already in flight, in which case the caller must not start one.
    pub(crate) fn begin(&self, key: &str) -> bool {
        self.lock().insert(key.to_owned())
    }

    /// Clear the revalidating mark for `key`.
    pub(crate) fn finish(&self, key: &str) {
        self.lock().remove(key);
    }

    /// Number of background refreshes currently in flight.
    pub(crate) fn len(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> MutexGuard<'_, HashSet<String>> {
        self.keys
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Default error sink: reports background failures as `tracing` warnings.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingErrorSink;

impl RevalidationErrorSink for TracingErrorSink {
    fn revalidation_failed(&self, key: &str, error: &CacheError) {
        warn!(key, %error, "background revalidation failed");
    }
}
