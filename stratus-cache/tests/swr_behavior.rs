//! Integration tests for stale-while-revalidate behavior.
//!
//! Tests verify:
//! - Freshness classification across the fresh / stale / expired windows
//! - Request deduplication under concurrent cold reads
//! - Single background revalidation per key, with failure isolation
//! - Invalidation (single key, substring pattern, clear)
//! - The full lifecycle of a key across a mocked clock

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use stratus_cache::{CacheError, CachePolicy, FetchError, SwrCache};
use stratus_test_utils::{
    settle, CountingFetcher, FailingFetcher, MockClock, RecordingErrorSink,
};

/// A cache on a mock clock with a recording sink, ready to be driven.
fn swr(policy: CachePolicy) -> (SwrCache<String, MockClock>, MockClock, RecordingErrorSink) {
    let clock = MockClock::new();
    let sink = RecordingErrorSink::new();
    let cache = SwrCache::with_parts(clock.clone(), policy, Arc::new(sink.clone()));
    (cache, clock, sink)
}

fn policy(ttl_secs: u64, window_secs: u64) -> CachePolicy {
    CachePolicy::new(
        Duration::from_secs(ttl_secs),
        Duration::from_secs(window_secs),
    )
}

// ============================================================================
// FRESHNESS CLASSIFICATION
// ============================================================================

#[tokio::test]
async fn entry_is_fresh_until_ttl_elapses() {
    let (cache, clock, _) = swr(policy(10, 50));
    cache.set("k", "v".to_string());

    clock.advance(Duration::from_secs(9));
    let state = cache.classify("k");
    assert!(state.is_fresh());
    assert_eq!(state.into_value().as_deref(), Some("v"));
}

#[tokio::test]
async fn entry_is_stale_within_the_grace_window() {
    let (cache, clock, _) = swr(policy(10, 50));
    cache.set("k", "v".to_string());

    clock.advance(Duration::from_secs(10));
    assert!(cache.classify("k").is_stale());

    clock.advance(Duration::from_secs(49));
    let state = cache.classify("k");
    assert!(state.is_stale());
    assert_eq!(state.into_value().as_deref(), Some("v"));
}

#[tokio::test]
async fn entry_expires_after_the_grace_window() {
    let (cache, clock, _) = swr(policy(10, 50));
    cache.set("k", "v".to_string());

    clock.advance(Duration::from_secs(60));
    assert!(cache.classify("k").is_missing());
    // The entry is still physically present until overwritten or removed.
    assert_eq!(cache.len(), 1);
}

// ============================================================================
// REQUEST DEDUPLICATION
// ============================================================================

#[tokio::test]
async fn concurrent_cold_reads_share_one_fetch() {
    let (cache, _, _) = swr(policy(10, 50));
    let fetcher = CountingFetcher::returning("fetched");

    let results = join_all((0..10).map(|_| cache.get("k", fetcher.fetcher()))).await;

    assert_eq!(fetcher.calls(), 1);
    for result in results {
        assert_eq!(result.unwrap(), "fetched");
    }
    assert_eq!(cache.stats().misses, 10);
    assert_eq!(cache.stats().pending_fetches, 0);
}

#[tokio::test]
async fn concurrent_cold_reads_share_one_failure() {
    let (cache, _, _) = swr(policy(10, 50));
    let fetcher = FailingFetcher::rejecting("upstream down");

    let results = join_all((0..3).map(|_| cache.get("k", fetcher.fetcher()))).await;

    assert_eq!(fetcher.calls(), 1);
    for result in results {
        assert_eq!(
            result.unwrap_err(),
            CacheError::fetch_failed("k", "upstream down")
        );
    }
    assert!(cache.is_empty());
}

#[tokio::test]
async fn sequential_reads_after_settlement_fetch_independently() {
    let (cache, clock, _) = swr(policy(10, 0));
    let fetcher = CountingFetcher::returning("v");

    cache.get("k", fetcher.fetcher()).await.unwrap();
    assert_eq!(fetcher.calls(), 1);

    // Aged out entirely; the second read is on its own.
    clock.advance(Duration::from_secs(11));
    cache.get("k", fetcher.fetcher()).await.unwrap();
    assert_eq!(fetcher.calls(), 2);
}

#[tokio::test]
async fn in_flight_fetch_is_visible_in_stats() {
    let (cache, _, _) = swr(policy(10, 50));
    let (tx, rx) = tokio::sync::oneshot::channel::<String>();

    let pending = {
        let cache = cache.clone();
        tokio::spawn(async move {
            cache
                .get("k", move || async move {
                    rx.await.map_err(|e| Box::new(e) as FetchError)
                })
                .await
        })
    };

    settle(|| cache.stats().pending_fetches == 1).await;
    tx.send("v".to_string()).unwrap();
    assert_eq!(pending.await.unwrap().unwrap(), "v");
    assert_eq!(cache.stats().pending_fetches, 0);
}

// ============================================================================
// BACKGROUND REVALIDATION
// ============================================================================

#[tokio::test]
async fn stale_burst_returns_immediately_and_refreshes_once() {
    let (cache, clock, _) = swr(policy(10, 50));
    cache.set("k", "v1".to_string());
    clock.advance(Duration::from_secs(15));

    let fetcher = CountingFetcher::returning("v2");
    let results = join_all((0..5).map(|_| cache.get("k", fetcher.fetcher()))).await;

    // Every stale reader got the old value without waiting on the fetch.
    for result in results {
        assert_eq!(result.unwrap(), "v1");
    }
    assert_eq!(cache.stats().stale_hits, 5);

    settle(|| cache.classify("k").is_fresh()).await;
    assert_eq!(fetcher.calls(), 1);
    assert_eq!(cache.classify("k").into_value().as_deref(), Some("v2"));
    assert_eq!(cache.stats().revalidating, 0);
    assert_eq!(cache.stats().refreshes, 1);
}

#[tokio::test]
async fn failed_revalidation_keeps_the_stale_entry_and_reports_to_the_sink() {
    let (cache, clock, sink) = swr(policy(10, 50));
    cache.set("k", "v1".to_string());
    clock.advance(Duration::from_secs(15));

    let fetcher = FailingFetcher::rejecting("backend 500");
    let value = cache.get("k", fetcher.fetcher()).await.unwrap();
    assert_eq!(value, "v1");

    settle(|| !sink.is_empty()).await;
    settle(|| cache.stats().revalidating == 0).await;
    assert_eq!(fetcher.calls(), 1);
    assert_eq!(
        sink.reports(),
        vec![(
            "k".to_string(),
            CacheError::fetch_failed("k", "backend 500")
        )]
    );

    // Still servable: the old value survived the failed refresh.
    let again = cache.get("k", fetcher.fetcher()).await.unwrap();
    assert_eq!(again, "v1");
    assert_eq!(cache.stats().refresh_failures, 1);
}

#[tokio::test]
async fn each_stale_read_after_a_failure_retries_the_refresh() {
    // Documented contract: no backoff. A failing upstream is retried on
    // every stale read until the entry fully expires.
    let (cache, clock, sink) = swr(policy(10, 500));
    cache.set("k", "v1".to_string());
    clock.advance(Duration::from_secs(15));

    let fetcher = FailingFetcher::rejecting("still down");
    cache.get("k", fetcher.fetcher()).await.unwrap();
    settle(|| cache.stats().revalidating == 0).await;

    cache.get("k", fetcher.fetcher()).await.unwrap();
    settle(|| cache.stats().revalidating == 0).await;

    assert_eq!(fetcher.calls(), 2);
    assert_eq!(sink.len(), 2);
}

// ============================================================================
// INVALIDATION
// ============================================================================

#[tokio::test]
async fn invalidation_forces_a_refetch() {
    let (cache, _, _) = swr(policy(10, 50));
    cache.set("a", "cached".to_string());
    assert!(cache.invalidate("a"));

    let fetcher = CountingFetcher::returning("refetched");
    let value = cache.get("a", fetcher.fetcher()).await.unwrap();
    assert_eq!(value, "refetched");
    assert_eq!(fetcher.calls(), 1);
}

#[tokio::test]
async fn pattern_invalidation_removes_exactly_the_matching_keys() {
    let (cache, _, _) = swr(policy(10, 50));
    cache.set("user:1", "a".to_string());
    cache.set("user:2", "b".to_string());
    cache.set("project:1", "c".to_string());

    assert_eq!(cache.invalidate_matching("user:"), 2);
    assert!(cache.classify("user:1").is_missing());
    assert!(cache.classify("user:2").is_missing());
    assert!(cache.classify("project:1").is_fresh());
}

#[tokio::test]
async fn clear_removes_everything() {
    let (cache, _, _) = swr(policy(10, 50));
    cache.set("a", "1".to_string());
    cache.set("b", "2".to_string());
    cache.clear();
    assert!(cache.is_empty());
    assert_eq!(cache.stats().keys, Vec::<String>::new());
}

#[tokio::test]
async fn foreground_failure_leaves_an_aged_out_entry_in_place() {
    let (cache, clock, _) = swr(policy(10, 0));
    cache.set("k", "old".to_string());
    clock.advance(Duration::from_secs(11));

    let fetcher = FailingFetcher::rejecting("nope");
    cache.get("k", fetcher.fetcher()).await.unwrap_err();

    // Nothing was written and the expired entry was not removed.
    assert_eq!(cache.len(), 1);
    assert!(cache.classify("k").is_missing());
}

// ============================================================================
// PREFETCH AND STATS
// ============================================================================

#[tokio::test]
async fn prefetch_warms_the_cache_without_yielding_a_value() {
    let (cache, _, _) = swr(policy(10, 50));
    let fetcher = CountingFetcher::returning("warmed");

    cache.prefetch("k", fetcher.fetcher()).await.unwrap();
    assert_eq!(fetcher.calls(), 1);

    // The warmed entry serves the next read with no fetch activity.
    let value = cache.get("k", fetcher.fetcher()).await.unwrap();
    assert_eq!(value, "warmed");
    assert_eq!(fetcher.calls(), 1);
}

#[tokio::test]
async fn stats_reflect_reads_and_store_contents() {
    let (cache, clock, _) = swr(policy(10, 50));
    let fetcher = CountingFetcher::returning("v");

    cache.get("k", fetcher.fetcher()).await.unwrap(); // miss
    cache.get("k", fetcher.fetcher()).await.unwrap(); // fresh hit
    clock.advance(Duration::from_secs(15));
    cache.get("k", fetcher.fetcher()).await.unwrap(); // stale hit
    settle(|| cache.stats().revalidating == 0).await;

    let stats = cache.stats();
    assert_eq!(stats.entries, 1);
    assert_eq!(stats.keys, vec!["k".to_string()]);
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.fresh_hits, 1);
    assert_eq!(stats.stale_hits, 1);
    assert!((stats.hit_rate() - 2.0 / 3.0).abs() < 0.001);
}

// ============================================================================
// END-TO-END LIFECYCLE
// ============================================================================

#[tokio::test]
async fn full_lifecycle_across_the_clock() {
    let (cache, clock, _) = swr(policy(10, 50));

    // t=0: seeded.
    cache.set("k", "v1".to_string());

    // t=5: fresh, no fetch.
    clock.advance(Duration::from_secs(5));
    let v2_fetcher = CountingFetcher::returning("v2");
    assert_eq!(cache.get("k", v2_fetcher.fetcher()).await.unwrap(), "v1");
    assert_eq!(v2_fetcher.calls(), 0);

    // t=15: stale; served immediately, refreshed behind the read.
    clock.advance(Duration::from_secs(10));
    assert_eq!(cache.get("k", v2_fetcher.fetcher()).await.unwrap(), "v1");
    settle(|| cache.classify("k").is_fresh()).await;
    assert_eq!(v2_fetcher.calls(), 1);

    // t=16: the refreshed value is fresh.
    clock.advance(Duration::from_secs(1));
    assert_eq!(cache.get("k", v2_fetcher.fetcher()).await.unwrap(), "v2");
    assert_eq!(v2_fetcher.calls(), 1);

    // t=200: aged out entirely; the read blocks on a new fetch.
    clock.advance(Duration::from_secs(184));
    let v3_fetcher = CountingFetcher::returning("v3");
    assert_eq!(cache.get("k", v3_fetcher.fetcher()).await.unwrap(), "v3");
    assert_eq!(v3_fetcher.calls(), 1);
    assert!(cache.classify("k").is_fresh());
}
