//! Keyed entry store.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use stratus_core::{CachePolicy, Timestamp};

use crate::entry::{CacheEntry, CacheState};

/// The cache's keyed entry store.
///
/// A single lock guards the map and every write is one insert or remove, so
/// readers never observe a partially written entry; the last write for a key
/// wins. There is no capacity bound: the store grows with the number of
/// distinct keys ever cached.
#[derive(Debug)]
pub struct CacheStore<T> {
    entries: Mutex<HashMap<String, CacheEntry<T>>>,
}

impl<T> Default for CacheStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> CacheStore<T> {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Store `value` under `key`, replacing any previous entry atomically.
    pub fn insert(&self, key: &str, value: T, now: Timestamp, policy: CachePolicy) {
        self.lock()
            .insert(key.to_owned(), CacheEntry::new(value, now, policy));
    }

    /// Remove the entry for `key`. Returns whether one was present.
    pub fn remove(&self, key: &str) -> bool {
        self.lock().remove(key).is_some()
    }

    /// Remove every entry whose key contains `fragment` as a literal
    /// substring. O(n) scan; returns the number of entries removed.
    pub fn remove_matching(&self, fragment: &str) -> usize {
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|key, _| !key.contains(fragment));
        before - entries.len()
    }

    /// Remove all entries.
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Number of entries physically present, including aged-out ones that
    /// have not been overwritten or invalidated yet.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// True when no entries are present.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// All keys currently present, sorted for deterministic output.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.lock().keys().cloned().collect();
        keys.sort();
        keys
    }

    // Lock sections never hold partial entries, so a poisoned lock still
    // guards a consistent map; take the inner guard rather than unwinding.
    fn lock(&self) -> MutexGuard<'_, HashMap<String, CacheEntry<T>>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<T: Clone> CacheStore<T> {
    /// Classify `key` at `now`. Pure read, no side effects.
    pub fn classify(&self, key: &str, now: Timestamp) -> CacheState<T> {
        match self.lock().get(key) {
            Some(entry) => entry.classify(now),
            None => CacheState::Missing,
        }
    }
}
