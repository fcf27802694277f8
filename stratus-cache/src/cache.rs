//! The stale-while-revalidate cache facade.

use std::future::Future;
use std::sync::Arc;

use tracing::debug;

use stratus_core::{
    CacheError, CachePolicy, CacheResult, Clock, FetchError, RevalidationErrorSink, SystemClock,
};

use crate::entry::CacheState;
use crate::flight::{FlightRole, InFlightTable};
use crate::revalidate::{RevalidatingSet, TracingErrorSink};
use crate::stats::{CacheStats, StatsCounters};
use crate::store::CacheStore;

/// Stale-while-revalidate cache with request deduplication.
///
/// Reads route through three states: a fresh entry is returned directly; a
/// stale entry is returned immediately while at most one background refresh
/// per key runs behind it; a missing or aged-out entry makes the caller
/// await a fetch, and concurrent callers for the same key share exactly one
/// underlying fetcher invocation.
///
/// The cache is an explicit handle, not a global: construct one per
/// application (or per value family) and clone it wherever it is consumed;
/// clones share the same store and coordination state. All time is read
/// through the injected [`Clock`], so tests drive expiry deterministically.
///
/// # Example
///
/// ```ignore
/// let cache: SwrCache<User> = SwrCache::with_policy(CachePolicy::realtime());
///
/// let user = cache
///     .get("user:42", || async { api.fetch_user(42).await })
///     .await?;
///
/// // A later read inside the TTL returns without touching the API; one
/// // past the TTL returns the cached user and refreshes in the background.
/// ```
pub struct SwrCache<T, C = SystemClock>
where
    T: Clone + Send + Sync + 'static,
    C: Clock,
{
    inner: Arc<CacheInner<T, C>>,
}

struct CacheInner<T, C> {
    store: CacheStore<T>,
    flights: InFlightTable<T>,
    revalidating: RevalidatingSet,
    counters: StatsCounters,
    clock: C,
    default_policy: CachePolicy,
    error_sink: Arc<dyn RevalidationErrorSink>,
}

impl<T> SwrCache<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Cache on the system clock with the default policy
    /// (fresh 30s, stale window 5min).
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }

    /// Cache on the system clock with an explicit default policy.
    pub fn with_policy(default_policy: CachePolicy) -> Self {
        Self::with_parts(SystemClock, default_policy, Arc::new(TracingErrorSink))
    }
}

impl<T> Default for SwrCache<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T, C> Clone for SwrCache<T, C>
where
    T: Clone + Send + Sync + 'static,
    C: Clock,
{
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T, C> SwrCache<T, C>
where
    T: Clone + Send + Sync + 'static,
    C: Clock,
{
    /// Cache on an injected clock with the default policy.
    pub fn with_clock(clock: C) -> Self {
        Self::with_parts(clock, CachePolicy::default(), Arc::new(TracingErrorSink))
    }

    /// Fully injected constructor: clock, default policy, and the sink that
    /// receives background revalidation failures.
    pub fn with_parts(
        clock: C,
        default_policy: CachePolicy,
        error_sink: Arc<dyn RevalidationErrorSink>,
    ) -> Self {
        Self {
            inner: Arc::new(CacheInner {
                store: CacheStore::new(),
                flights: InFlightTable::new(),
                revalidating: RevalidatingSet::new(),
                counters: StatsCounters::default(),
                clock,
                default_policy,
                error_sink,
            }),
        }
    }

    /// The policy applied when a read or write does not supply one.
    pub fn default_policy(&self) -> CachePolicy {
        self.inner.default_policy
    }

    /// Classify `key` against the clock without side effects.
    pub fn classify(&self, key: &str) -> CacheState<T> {
        self.inner.store.classify(key, self.inner.clock.now())
    }

    /// Store `value` under `key` with the default policy.
    pub fn set(&self, key: &str, value: T) {
        self.set_with(key, value, self.inner.default_policy);
    }

    /// Store `value` under `key`, replacing any previous entry atomically.
    /// The freshness bounds are recomputed from `policy` at the clock's
    /// current time.
    pub fn set_with(&self, key: &str, value: T, policy: CachePolicy) {
        self.inner
            .store
            .insert(key, value, self.inner.clock.now(), policy);
    }

    /// Read `key` through the cache with the default policy. See
    /// [`SwrCache::get_with`].
    pub async fn get<F, Fut>(&self, key: &str, fetcher: F) -> CacheResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, FetchError>> + Send + 'static,
    {
        self.get_with(key, self.inner.default_policy, fetcher).await
    }

    /// Read `key` through the cache.
    ///
    /// - Fresh entry: returned directly, `fetcher` untouched.
    /// - Stale entry: returned immediately; `fetcher` runs in a detached
    ///   background task unless a refresh for the key is already in flight.
    ///   Its failure is reported to the error sink, never to a caller.
    /// - Missing or aged-out entry: the caller awaits the key's in-flight
    ///   fetch, starting it if none exists. Every concurrent caller
    ///   resolves to that one fetch's result; a failure propagates to all
    ///   of them and writes nothing.
    pub async fn get_with<F, Fut>(
        &self,
        key: &str,
        policy: CachePolicy,
        fetcher: F,
    ) -> CacheResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, FetchError>> + Send + 'static,
    {
        match self.classify(key) {
            CacheState::Fresh(value) => {
                self.inner.counters.record_fresh_hit();
                Ok(value)
            }
            CacheState::Stale(value) => {
                self.inner.counters.record_stale_hit();
                self.spawn_revalidation(key, policy, fetcher);
                Ok(value)
            }
            CacheState::Missing => {
                self.inner.counters.record_miss();
                self.fetch_coordinated(key, policy, fetcher).await
            }
        }
    }

    /// Warm the cache for `key` without using the value. Inherits all
    /// deduplication and revalidation guarantees of [`SwrCache::get`].
    pub async fn prefetch<F, Fut>(&self, key: &str, fetcher: F) -> CacheResult<()>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, FetchError>> + Send + 'static,
    {
        self.get(key, fetcher).await.map(|_| ())
    }

    /// [`SwrCache::prefetch`] with an explicit policy.
    pub async fn prefetch_with<F, Fut>(
        &self,
        key: &str,
        policy: CachePolicy,
        fetcher: F,
    ) -> CacheResult<()>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, FetchError>> + Send + 'static,
    {
        self.get_with(key, policy, fetcher).await.map(|_| ())
    }

    /// Remove the entry for `key`. Returns whether one was present.
    ///
    /// An in-flight fetch or background refresh for the key is not
    /// cancelled; it settles normally and will store its result. Callers
    /// that need the next read to hit the network regardless should
    /// invalidate after such work has settled.
    pub fn invalidate(&self, key: &str) -> bool {
        self.inner.store.remove(key)
    }

    /// Remove every entry whose key contains `fragment` as a literal
    /// substring. Returns the number of entries removed.
    pub fn invalidate_matching(&self, fragment: &str) -> usize {
        self.inner.store.remove_matching(fragment)
    }

    /// Remove all entries. In-flight and revalidation bookkeeping is left
    /// alone; both self-clean when their work settles.
    pub fn clear(&self) {
        self.inner.store.clear();
    }

    /// Number of entries physically present.
    pub fn len(&self) -> usize {
        self.inner.store.len()
    }

    /// True when the store holds no entries.
    pub fn is_empty(&self) -> bool {
        self.inner.store.is_empty()
    }

    /// True when `key` currently classifies as servable (fresh or stale).
    pub fn contains(&self, key: &str) -> bool {
        !self.classify(key).is_missing()
    }

    /// Point-in-time statistics snapshot.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.inner.store.len(),
            pending_fetches: self.inner.flights.len(),
            revalidating: self.inner.revalidating.len(),
            keys: self.inner.store.keys(),
            fresh_hits: self.inner.counters.fresh_hits(),
            stale_hits: self.inner.counters.stale_hits(),
            misses: self.inner.counters.misses(),
            refreshes: self.inner.counters.refreshes(),
            refresh_failures: self.inner.counters.refresh_failures(),
        }
    }

    /// Await the key's in-flight fetch, starting it if none exists.
    ///
    /// The leader registers its flight slot synchronously, before anything
    /// awaits, then runs the fetcher in a detached task pair: the fetch
    /// task itself, and a supervisor that stores the result and settles the
    /// flight. Detaching means a caller that drops its future cannot strand
    /// the followers, and a panicking fetcher settles as an error instead
    /// of leaving the key permanently in flight.
    async fn fetch_coordinated<F, Fut>(
        &self,
        key: &str,
        policy: CachePolicy,
        fetcher: F,
    ) -> CacheResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, FetchError>> + Send + 'static,
    {
        let mut rx = match self.inner.flights.join_or_lead(key) {
            FlightRole::Follower(rx) => {
                debug!(key, "joined in-flight fetch");
                rx
            }
            FlightRole::Leader(rx) => {
                let fetch = tokio::spawn(fetcher());
                let inner = Arc::clone(&self.inner);
                let key = key.to_owned();
                tokio::spawn(async move {
                    let outcome = match fetch.await {
                        Ok(Ok(value)) => {
                            inner
                                .store
                                .insert(&key, value.clone(), inner.clock.now(), policy);
                            Ok(value)
                        }
                        Ok(Err(err)) => Err(CacheError::fetch_failed(&key, err)),
                        Err(_join_err) => Err(CacheError::FetchAborted { key: key.clone() }),
                    };
                    inner.flights.settle(&key, outcome);
                });
                rx
            }
        };

        match rx.recv().await {
            Ok(outcome) => outcome,
            // The slot vanished without a settlement message.
            Err(_) => Err(CacheError::FetchAborted {
                key: key.to_owned(),
            }),
        }
    }

    /// Ensure exactly one background refresh for `key` is running.
    ///
    /// The revalidating mark is taken synchronously before anything is
    /// spawned; losers of the election drop their fetcher unused. The
    /// caller is never blocked and never sees the refresh outcome.
    fn spawn_revalidation<F, Fut>(&self, key: &str, policy: CachePolicy, fetcher: F)
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, FetchError>> + Send + 'static,
    {
        if !self.inner.revalidating.begin(key) {
            return;
        }
        let fetch = tokio::spawn(fetcher());
        let inner = Arc::clone(&self.inner);
        let key = key.to_owned();
        tokio::spawn(async move {
            match fetch.await {
                Ok(Ok(value)) => {
                    inner.store.insert(&key, value, inner.clock.now(), policy);
                    inner.counters.record_refresh();
                    debug!(key, "background revalidation stored a fresh value");
                }
                Ok(Err(err)) => {
                    let error = CacheError::fetch_failed(&key, err);
                    inner.counters.record_refresh_failure();
                    inner.error_sink.revalidation_failed(&key, &error);
                }
                Err(_join_err) => {
                    let error = CacheError::FetchAborted { key: key.clone() };
                    inner.counters.record_refresh_failure();
                    inner.error_sink.revalidation_failed(&key, &error);
                }
            }
            inner.revalidating.finish(&key);
        });
    }
}
