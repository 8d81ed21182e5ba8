use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tollgate_lib::security::rate_limit::{
    BucketParams, ClientLimiterTable, RateLimitResult, Sweeper, TokenBucket,
};
use tokio_util::sync::CancellationToken;

#[test]
fn test_burst_bound_without_elapsed_time() {
    let now = Instant::now();
    let bucket = TokenBucket::new_at(BucketParams::new(2.0, 4), now);

    let admitted = (0..20).filter(|_| bucket.allow_at(now)).count();
    assert_eq!(admitted, 4, "a fresh bucket admits exactly `burst` requests at one instant");
}

#[test]
fn test_two_per_second_burst_four_scenario() {
    let start = Instant::now();
    let table = ClientLimiterTable::new(BucketParams::new(2.0, 4));

    let mut results = Vec::new();
    for _ in 0..6 {
        let bucket = table.get_or_create_at("203.0.113.7", start);
        results.push(bucket.allow_at(start));
    }
    assert_eq!(results, vec![true, true, true, true, false, false]);

    let later = start + Duration::from_secs(1);
    let bucket = table.get_or_create_at("203.0.113.7", later);
    assert!(bucket.allow_at(later), "two tokens refilled after one second");
}

#[test]
fn test_limited_result_reports_wait_time() {
    let now = Instant::now();
    let bucket = TokenBucket::new_at(BucketParams::new(2.0, 1), now);

    assert!(bucket.check_at(now).is_allowed());
    match bucket.check_at(now) {
        RateLimitResult::Limited { limit, reset_after } => {
            assert_eq!(limit, 1);
            assert_eq!(reset_after, Duration::from_millis(500));
        }
        other => panic!("expected Limited, got {other:?}"),
    }
}

#[test]
fn test_identities_are_independent() {
    let now = Instant::now();
    let table = ClientLimiterTable::new(BucketParams::new(1.0, 3));

    let a = table.get_or_create_at("198.51.100.1", now);
    while a.allow_at(now) {}
    assert!(!a.allow_at(now));

    let b = table.get_or_create_at("198.51.100.2", now);
    let admitted = (0..10).filter(|_| b.allow_at(now)).count();
    assert_eq!(admitted, 3);
    assert_eq!(table.len(), 2);
}

#[test]
fn test_same_identity_shares_one_bucket() {
    let table = ClientLimiterTable::new(BucketParams::new(1.0, 2));
    let first = table.get_or_create("client");
    let second = table.get_or_create("client");
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(table.len(), 1);
}

#[test]
fn test_eviction_is_idempotent() {
    let start = Instant::now();
    let table = ClientLimiterTable::new(BucketParams::new(1.0, 1));
    table.get_or_create_at("stale", start);
    table.get_or_create_at("fresh", start + Duration::from_secs(170));

    let now = start + Duration::from_secs(200);
    let threshold = Duration::from_secs(180);
    assert_eq!(table.evict_stale_at(now, threshold), 1);
    assert_eq!(table.evict_stale_at(now, threshold), 0);
    assert!(!table.contains("stale"));
    assert!(table.contains("fresh"));
}

#[test]
fn test_eviction_boundary() {
    let start = Instant::now();
    let threshold = Duration::from_secs(180);
    let epsilon = Duration::from_millis(1);

    let table = ClientLimiterTable::new(BucketParams::new(1.0, 1));
    table.get_or_create_at("client", start);

    assert_eq!(table.evict_stale_at(start + threshold - epsilon, threshold), 0);
    assert_eq!(table.evict_stale_at(start + threshold, threshold), 0);
    assert!(table.contains("client"));

    assert_eq!(table.evict_stale_at(start + threshold + epsilon, threshold), 1);
    assert!(table.is_empty());
}

#[test]
fn test_activity_refreshes_last_seen() {
    let start = Instant::now();
    let threshold = Duration::from_secs(10);
    let table = ClientLimiterTable::new(BucketParams::new(1.0, 1));

    table.get_or_create_at("client", start);
    table.get_or_create_at("client", start + Duration::from_secs(8));

    assert_eq!(table.evict_stale_at(start + Duration::from_secs(15), threshold), 0);
    assert_eq!(table.evict_stale_at(start + Duration::from_secs(19), threshold), 1);
}

#[test]
fn test_concurrent_access_never_exceeds_burst() {
    let table = Arc::new(ClientLimiterTable::new(BucketParams::new(0.001, 50)));
    let admitted = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let table = Arc::clone(&table);
            let admitted = Arc::clone(&admitted);
            std::thread::spawn(move || {
                for _ in 0..100 {
                    if table.get_or_create("shared").allow() {
                        admitted.fetch_add(1, Ordering::Relaxed);
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap_or_else(|_| panic!("worker thread panicked"));
    }

    // 800 attempts within a few ms, refill at 0.001/s: only the burst gets through
    assert_eq!(admitted.load(Ordering::Relaxed), 50);
    assert_eq!(table.len(), 1);
}

#[tokio::test]
async fn test_sweeper_evicts_on_tick_and_stops_on_cancel(
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let table = Arc::new(ClientLimiterTable::new(BucketParams::new(1.0, 1)));
    let sweeper =
        Sweeper::new(Arc::clone(&table), Duration::from_millis(20), Duration::from_millis(20));
    table.get_or_create("idle-client");

    let cancel = CancellationToken::new();
    let handle = sweeper.spawn(cancel.clone());

    tokio::time::sleep(Duration::from_millis(150)).await;
    assert!(!table.contains("idle-client"), "idle client should be swept");

    cancel.cancel();
    tokio::time::timeout(Duration::from_secs(1), handle).await??;
    Ok(())
}

#[test]
fn test_sweep_once_uses_threshold() {
    let table = Arc::new(ClientLimiterTable::new(BucketParams::new(1.0, 1)));
    table.get_or_create("client");

    let keep = Sweeper::new(Arc::clone(&table), Duration::from_secs(1), Duration::from_secs(60));
    assert_eq!(keep.sweep_once(), 0);

    std::thread::sleep(Duration::from_millis(20));
    let evict = Sweeper::new(
        Arc::clone(&table),
        Duration::from_millis(1),
        Duration::from_millis(5),
    );
    assert_eq!(evict.sweep_once(), 1);
    assert!(table.is_empty());
}
