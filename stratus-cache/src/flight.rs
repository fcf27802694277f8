//! In-flight fetch coordination.
//!
//! Deduplicates concurrent fetches for the same key: the first caller to
//! find a key missing becomes the leader and starts the fetch; every later
//! caller joins as a follower and awaits the leader's settlement. The
//! shared future is a oneshot broadcast channel: exactly one message,
//! fanned out to however many waiters subscribed.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use tokio::sync::broadcast;

use stratus_core::CacheResult;

type Slot<T> = broadcast::Sender<CacheResult<T>>;

/// Role assigned to a caller whose key classified as missing.
pub(crate) enum FlightRole<T> {
    /// This caller starts the fetch. It must settle the flight via
    /// [`InFlightTable::settle`], success or failure, and then awaits its
    /// own receiver like any follower.
    Leader(broadcast::Receiver<CacheResult<T>>),
    /// Another caller's fetch is outstanding; await this receiver.
    Follower(broadcast::Receiver<CacheResult<T>>),
}

/// Table of outstanding foreground fetches, at most one slot per key.
///
/// A slot exists only while a fetch for that key is outstanding; it is
/// removed unconditionally when the fetch settles. Registration happens
/// synchronously under the table lock, before the leader first awaits its
/// fetcher, so two callers can never both lead the same key.
#[derive(Debug)]
pub(crate) struct InFlightTable<T> {
    flights: Mutex<HashMap<String, Slot<T>>>,
}

impl<T: Clone> InFlightTable<T> {
    pub(crate) fn new() -> Self {
        Self {
            flights: Mutex::new(HashMap::new()),
        }
    }

    /// Join the in-flight fetch for `key`, or register as its leader.
    pub(crate) fn join_or_lead(&self, key: &str) -> FlightRole<T> {
        let mut flights = self.lock();
        if let Some(slot) = flights.get(key) {
            FlightRole::Follower(slot.subscribe())
        } else {
            let (tx, rx) = broadcast::channel(1);
            flights.insert(key.to_owned(), tx);
            FlightRole::Leader(rx)
        }
    }

    /// Settle the flight for `key`: deregister the slot, then fan the
    /// outcome out to every subscribed waiter.
    ///
    /// Removal and send happen under the same lock that followers subscribe
    /// under, so a follower that found the slot always receives the
    /// settlement; a caller arriving after removal starts a new flight.
    pub(crate) fn settle(&self, key: &str, outcome: CacheResult<T>) {
        let mut flights = self.lock();
        if let Some(slot) = flights.remove(key) {
            // No subscribers left is fine; the result is already stored.
            let _ = slot.send(outcome);
        }
    }

    /// Number of fetches currently outstanding.
    pub(crate) fn len(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Slot<T>>> {
        self.flights
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
