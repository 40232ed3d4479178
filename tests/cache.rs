mod common;

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use common::{FakeSource, entry};
use vibecheck::{AppError, GroupId, RefreshOutcome, SymbolCache, SymbolHandle};

fn cache_over(source: &Arc<FakeSource>, interval: Duration) -> Arc<SymbolCache> {
    Arc::new(SymbolCache::new(source.clone(), interval))
}

#[tokio::test]
async fn test_refresh_with_no_groups_publishes_empty_table() {
    let source = Arc::new(FakeSource::default());
    let cache = cache_over(&source, Duration::from_secs(3600));

    let outcome = cache.refresh().await.unwrap();
    assert_eq!(
        outcome,
        RefreshOutcome::Published {
            generation: 1,
            symbols: 0,
            failed_groups: 0
        }
    );
    assert!(cache.is_empty());
    assert!(cache.list_names().is_empty());
    assert_eq!(cache.snapshot().generation(), 1);
}

#[tokio::test]
async fn test_lookup_before_first_refresh_finds_nothing() {
    let source = Arc::new(FakeSource::with_groups(vec![(1, vec![entry("party", 10)])]));
    let cache = cache_over(&source, Duration::from_secs(3600));

    assert!(cache.lookup("party").is_none());
    assert_eq!(cache.snapshot().generation(), 0);
}

#[tokio::test]
async fn test_first_group_in_id_order_wins_name_collisions() {
    let source = Arc::new(FakeSource::with_groups(vec![
        (20, vec![entry("party", 2000), entry("cat", 2001)]),
        (10, vec![entry("party", 1000), entry("wave", 1001)]),
    ]));
    let cache = cache_over(&source, Duration::from_secs(3600));
    cache.refresh().await.unwrap();

    let party = cache.lookup("party").unwrap();
    assert_eq!(party.handle, SymbolHandle(1000));
    assert_eq!(party.group, Some(GroupId(10)));
    assert_eq!(cache.list_names(), vec!["cat", "party", "wave"]);

    // Same result however the source orders its groups.
    source.set_groups(vec![
        (10, vec![entry("party", 1000), entry("wave", 1001)]),
        (20, vec![entry("party", 2000), entry("cat", 2001)]),
    ]);
    cache.refresh().await.unwrap();
    assert_eq!(cache.lookup("party").unwrap().handle, SymbolHandle(1000));
}

#[tokio::test]
async fn test_failing_group_is_skipped_for_the_cycle() {
    let source = Arc::new(FakeSource::with_groups(vec![
        (1, vec![entry("wave", 11)]),
        (2, vec![entry("party", 22)]),
    ]));
    source.fail_group(2);
    let cache = cache_over(&source, Duration::from_secs(3600));

    let outcome = cache.refresh().await.unwrap();
    assert_eq!(
        outcome,
        RefreshOutcome::Published {
            generation: 1,
            symbols: 1,
            failed_groups: 1
        }
    );
    assert!(cache.lookup("wave").is_some());
    assert!(cache.lookup("party").is_none());
}

#[tokio::test]
async fn test_failed_group_listing_keeps_previous_snapshot() {
    let source = Arc::new(FakeSource::with_groups(vec![(1, vec![entry("wave", 11)])]));
    let cache = cache_over(&source, Duration::from_secs(3600));
    cache.refresh().await.unwrap();

    *source.fail_listing.lock().unwrap() = true;
    assert!(cache.refresh().await.is_err());
    assert_eq!(cache.lookup("wave").unwrap().handle, SymbolHandle(11));
    assert_eq!(cache.snapshot().generation(), 1);

    // The in-flight flag was released by the failed attempt.
    *source.fail_listing.lock().unwrap() = false;
    assert!(matches!(
        cache.refresh().await.unwrap(),
        RefreshOutcome::Published { generation: 2, .. }
    ));
}

#[tokio::test]
async fn test_removed_symbols_disappear_after_refresh() {
    let source = Arc::new(FakeSource::with_groups(vec![(
        1,
        vec![entry("wave", 11), entry("party", 12)],
    )]));
    let cache = cache_over(&source, Duration::from_secs(3600));
    cache.refresh().await.unwrap();
    assert_eq!(cache.len(), 2);

    source.set_groups(vec![(1, vec![entry("wave", 11)])]);
    cache.refresh().await.unwrap();
    assert_eq!(cache.list_names(), vec!["wave"]);
}

#[tokio::test]
async fn test_overlapping_refresh_is_skipped() {
    let source = Arc::new(FakeSource::with_groups(vec![(1, vec![entry("wave", 11)])]));
    source.set_delay(Duration::from_millis(100));
    let cache = cache_over(&source, Duration::from_secs(3600));

    let (first, second) = tokio::join!(cache.refresh(), cache.refresh());
    assert!(matches!(first.unwrap(), RefreshOutcome::Published { .. }));
    assert_eq!(second.unwrap(), RefreshOutcome::Skipped);
    assert_eq!(source.list_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_stop_releases_table_and_late_refresh_cannot_republish() {
    let source = Arc::new(FakeSource::with_groups(vec![(1, vec![entry("wave", 11)])]));
    let cache = cache_over(&source, Duration::from_secs(3600));
    cache.refresh().await.unwrap();
    assert!(!cache.is_empty());

    source.set_delay(Duration::from_millis(100));
    let pending = {
        let cache = Arc::clone(&cache);
        tokio::spawn(async move { cache.refresh().await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;

    cache.stop();
    assert!(cache.is_stopped());
    assert!(cache.is_empty());

    assert_eq!(pending.await.unwrap().unwrap(), RefreshOutcome::Skipped);
    assert!(cache.is_empty());
    assert!(cache.lookup("wave").is_none());

    // Stopping twice is harmless.
    cache.stop();
    assert!(cache.is_empty());
}

#[tokio::test]
async fn test_start_after_stop_is_rejected() {
    let source = Arc::new(FakeSource::default());
    let cache = cache_over(&source, Duration::from_secs(3600));
    cache.stop();

    assert!(matches!(cache.start().await, Err(AppError::CacheStopped)));
    assert_eq!(source.list_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_start_survives_failing_initial_refresh() {
    let source = Arc::new(FakeSource::default());
    *source.fail_listing.lock().unwrap() = true;
    let cache = cache_over(&source, Duration::from_secs(3600));

    assert!(cache.start().await.is_ok());
    assert!(cache.is_empty());
    assert!(cache.is_scheduled());
    cache.stop();
    assert!(!cache.is_scheduled());
}

#[tokio::test]
async fn test_stop_during_start_leaves_no_refresh_task() {
    let source = Arc::new(FakeSource::with_groups(vec![(1, vec![entry("wave", 11)])]));
    source.set_delay(Duration::from_millis(100));
    let cache = cache_over(&source, Duration::from_millis(30));

    let starting = {
        let cache = Arc::clone(&cache);
        tokio::spawn(async move { cache.start().await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    cache.stop();

    assert!(matches!(starting.await.unwrap(), Err(AppError::CacheStopped)));
    assert!(!cache.is_scheduled());
    assert!(cache.is_empty());

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(source.list_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_periodic_refresh_picks_up_new_symbols() {
    let source = Arc::new(FakeSource::with_groups(vec![(1, vec![entry("wave", 11)])]));
    let cache = cache_over(&source, Duration::from_millis(50));
    cache.start().await.unwrap();
    assert!(cache.lookup("party").is_none());

    source.set_groups(vec![(1, vec![entry("wave", 11), entry("party", 12)])]);
    let mut found = false;
    for _ in 0..40 {
        tokio::time::sleep(Duration::from_millis(25)).await;
        if cache.lookup("party").is_some() {
            found = true;
            break;
        }
    }
    assert!(found, "periodic refresh never published the new symbol");
    assert!(source.list_calls.load(Ordering::SeqCst) >= 2);

    cache.stop();
    let calls = source.list_calls.load(Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(source.list_calls.load(Ordering::SeqCst), calls);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_readers_never_observe_mixed_generations() {
    // Every symbol of generation n carries handle n, so a table mixing two
    // refreshes would show two different handles.
    fn generation_groups(n: u64) -> Vec<(u64, Vec<vibecheck::SymbolEntry>)> {
        (1..=5)
            .map(|group| {
                let symbols = (0..20).map(|i| entry(&format!("s{group}_{i}"), n)).collect();
                (group, symbols)
            })
            .collect()
    }

    let source = Arc::new(FakeSource::with_groups(generation_groups(1)));
    let cache = cache_over(&source, Duration::from_secs(3600));
    cache.refresh().await.unwrap();

    let writer = {
        let cache = Arc::clone(&cache);
        let source = Arc::clone(&source);
        tokio::spawn(async move {
            for n in 2..=50 {
                source.set_groups(generation_groups(n));
                cache.refresh().await.unwrap();
                tokio::task::yield_now().await;
            }
        })
    };

    let readers: Vec<_> = (0..3)
        .map(|_| {
            let cache = Arc::clone(&cache);
            tokio::spawn(async move {
                for _ in 0..500 {
                    let table = cache.snapshot();
                    let mut handles = table.entries().map(|entry| entry.handle);
                    let first = handles.next().unwrap();
                    assert!(handles.all(|handle| handle == first));
                    assert_eq!(table.len(), 100);
                    tokio::task::yield_now().await;
                }
            })
        })
        .collect();

    writer.await.unwrap();
    for reader in readers {
        reader.await.unwrap();
    }
    assert_eq!(cache.lookup("s3_7").unwrap().handle, SymbolHandle(50));
}
