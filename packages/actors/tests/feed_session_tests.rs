#![allow(clippy::disallowed_methods)]

mod common;

use std::sync::Arc;
use std::time::Duration;

use actors::{FlushReason, start_feed_session};
use feed_core::{
    ErrorSource, FeedConfig, FeedEvent, FeedPhase, FeedStore, MemoryFeedStore,
    MemoryProgressCache, ProgressRecord, SavedSet,
};
use storage::{LocalProgressCache, Storage, StorageConfig};

use common::{GatedStore, test_config, user, wait_for_snapshot, wait_ready, wait_until};

const WAIT: Duration = Duration::from_secs(3);

#[tokio::test]
async fn test_newer_remote_wins_and_resumes_at_position_zero() {
    let store = Arc::new(MemoryFeedStore::with_postings(100));
    let cache = Arc::new(MemoryProgressCache::new());
    let items = store.ordered();

    cache.seed(ProgressRecord::new(user(), items[10].id, 10, None, 1000));
    store.seed_progress(ProgressRecord::new(user(), items[25].id, 25, None, 2000));

    let session = start_feed_session(user(), store.clone(), cache.clone(), test_config())
        .await
        .unwrap();
    let snapshot = wait_ready(&session).await;

    assert_eq!(snapshot.index, 0);
    assert_eq!(snapshot.current.map(|p| p.id), Some(items[25].id));
    // The resumed item plus one batch after it.
    assert_eq!(snapshot.loaded, 51);
    assert_eq!(snapshot.last_error, None);

    let local = cache.stored(&user()).unwrap();
    assert_eq!((local.item_id, local.index), (items[25].id, 25));

    session.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_fresh_user_starts_at_first_item() {
    let store = Arc::new(MemoryFeedStore::with_postings(10));
    let cache = Arc::new(MemoryProgressCache::new());
    let items = store.ordered();

    let session = start_feed_session(user(), store.clone(), cache, test_config())
        .await
        .unwrap();
    let snapshot = wait_ready(&session).await;

    assert_eq!(snapshot.current.map(|p| p.id), Some(items[0].id));
    // A short first page keeps paginating until the empty page.
    let snapshot = wait_for_snapshot(&session, |s| s.exhausted).await;
    assert_eq!(snapshot.loaded, 10);

    session.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_resumes_from_local_cache() {
    let store = Arc::new(MemoryFeedStore::with_postings(30));
    let items = store.ordered();

    let storage = Storage::new(StorageConfig::memory()).unwrap();
    let cache = Arc::new(LocalProgressCache::open(storage).await.unwrap());
    cache
        .store(&ProgressRecord::new(user(), items[7].id, 7, None, 500))
        .await
        .unwrap();

    let session = start_feed_session(user(), store, cache, test_config())
        .await
        .unwrap();
    let snapshot = wait_ready(&session).await;

    assert_eq!(snapshot.current.map(|p| p.id), Some(items[7].id));

    session.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_offline_start_stays_interactive_and_recovers() {
    let store = Arc::new(MemoryFeedStore::with_postings(20));
    let cache = Arc::new(MemoryProgressCache::new());
    store.set_available(false);

    let session = start_feed_session(user(), store.clone(), cache, test_config())
        .await
        .unwrap();

    let snapshot = wait_for_snapshot(&session, |s| {
        s.phase == FeedPhase::LoadingFirstPage
            && !s.fetching
            && s.last_error.as_ref().is_some_and(|e| e.source == ErrorSource::Pagination)
    })
    .await;
    assert_eq!(snapshot.loaded, 0);

    // Index changes before the feed is ready are ignored.
    session.set_index(1).unwrap();
    let snapshot = session.snapshot().await.unwrap();
    assert_eq!(snapshot.index, 0);
    assert_eq!(snapshot.dismissed_count, 0);

    store.set_available(true);
    session.retry().unwrap();
    let snapshot = wait_ready(&session).await;
    assert_eq!(snapshot.loaded, 20);
    assert_eq!(snapshot.last_error, None);

    session.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_only_single_forward_step_dismisses() {
    let store = Arc::new(MemoryFeedStore::with_postings(100));
    let cache = Arc::new(MemoryProgressCache::new());
    let items = store.ordered();

    let session = start_feed_session(user(), store.clone(), cache, test_config())
        .await
        .unwrap();
    wait_ready(&session).await;

    session.set_index(1).unwrap();
    session.set_index(4).unwrap();
    session.set_index(3).unwrap();
    session.set_index(3).unwrap();

    let snapshot = session.snapshot().await.unwrap();
    assert_eq!(snapshot.index, 3);
    assert_eq!(snapshot.dismissed_count, 1);

    assert!(wait_until(WAIT, || store.stored_dismissed(&user()).contains(&items[0].id)).await);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(store.stored_dismissed(&user()).len(), 1);

    // Explicit dismiss twice leaves one entry.
    session.dismiss(items[50].id).unwrap();
    session.dismiss(items[50].id).unwrap();
    assert!(wait_until(WAIT, || store.stored_dismissed(&user()).len() == 2).await);
    let snapshot = session.snapshot().await.unwrap();
    assert_eq!(snapshot.dismissed_count, 2);

    session.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_out_of_range_index_is_rejected() {
    let store = Arc::new(MemoryFeedStore::with_postings(100));
    let cache = Arc::new(MemoryProgressCache::new());

    let session = start_feed_session(user(), store, cache, test_config())
        .await
        .unwrap();
    let snapshot = wait_ready(&session).await;

    session.set_index(snapshot.loaded + 5).unwrap();
    assert_eq!(session.snapshot().await.unwrap().index, 0);

    session.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_prefetch_fires_within_threshold() {
    let store = Arc::new(MemoryFeedStore::with_postings(120));
    let cache = Arc::new(MemoryProgressCache::new());

    let session = start_feed_session(user(), store, cache, test_config())
        .await
        .unwrap();
    let snapshot = wait_ready(&session).await;
    assert_eq!(snapshot.loaded, 50);

    // 19 < 50 - 30: no fetch yet.
    session.set_index(19).unwrap();
    let snapshot = session.snapshot().await.unwrap();
    assert!(!snapshot.fetching);
    assert_eq!(snapshot.loaded, 50);

    // 49 >= 50 - 30
    session.set_index(49).unwrap();
    let snapshot = wait_for_snapshot(&session, |s| s.loaded == 100 && !s.fetching).await;
    assert!(!snapshot.exhausted);

    session.set_index(99).unwrap();
    let snapshot = wait_for_snapshot(&session, |s| s.exhausted).await;
    assert_eq!(snapshot.loaded, 120);

    session.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_debounced_save_writes_remote_on_checkpoints_only() {
    let store = Arc::new(MemoryFeedStore::with_postings(100));
    let cache = Arc::new(MemoryProgressCache::new());
    let items = store.ordered();

    let session = start_feed_session(user(), store.clone(), cache.clone(), test_config())
        .await
        .unwrap();
    wait_ready(&session).await;

    session.set_index(1).unwrap();
    assert!(wait_until(WAIT, || cache.stored(&user()).is_some_and(|r| r.index == 1)).await);
    assert_eq!(store.stored_progress(&user()), None);

    session.set_index(5).unwrap();
    assert!(wait_until(WAIT, || store.stored_progress(&user()).is_some_and(|r| r.index == 5)).await);

    let local = cache.stored(&user()).unwrap();
    let remote = store.stored_progress(&user()).unwrap();
    assert_eq!(local, remote);
    assert_eq!(remote.item_id, items[5].id);
    assert_eq!(remote.item_created_at, Some(items[5].created_at));

    // Rapid changes collapse into one save of the last index.
    let writes = store.progress_writes();
    session.set_index(6).unwrap();
    session.set_index(7).unwrap();
    session.set_index(8).unwrap();
    assert!(wait_until(WAIT, || cache.stored(&user()).is_some_and(|r| r.index == 8)).await);
    tokio::time::sleep(Duration::from_millis(60)).await;
    assert_eq!(store.progress_writes(), writes);
    assert!(cache.stored(&user()).unwrap().timestamp > remote.timestamp);

    session.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_autosave_writes_remote_independently() {
    let store = Arc::new(MemoryFeedStore::with_postings(20));
    let cache = Arc::new(MemoryProgressCache::new());
    let config = FeedConfig {
        debounce_ms: 60_000,
        autosave_secs: 1,
        ..FeedConfig::default()
    };

    let session = start_feed_session(user(), store.clone(), cache.clone(), config)
        .await
        .unwrap();
    wait_ready(&session).await;

    session.set_index(3).unwrap();
    assert!(
        wait_until(Duration::from_secs(5), || {
            store.stored_progress(&user()).is_some_and(|r| r.index == 3)
        })
        .await
    );
    assert_eq!(cache.stored(&user()).map(|r| r.index), Some(3));

    session.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_autosave_tolerates_remote_failure() {
    let store = Arc::new(MemoryFeedStore::with_postings(20));
    let cache = Arc::new(MemoryProgressCache::new());
    let config = FeedConfig {
        debounce_ms: 60_000,
        autosave_secs: 1,
        ..FeedConfig::default()
    };

    let session = start_feed_session(user(), store.clone(), cache.clone(), config)
        .await
        .unwrap();
    wait_ready(&session).await;

    session.set_index(2).unwrap();
    store.set_available(false);

    assert!(
        wait_until(Duration::from_secs(5), || {
            cache.stored(&user()).is_some_and(|r| r.index == 2)
        })
        .await
    );
    let snapshot = wait_for_snapshot(&session, |s| {
        s.last_error.as_ref().is_some_and(|e| e.source == ErrorSource::Progress)
    })
    .await;
    assert_eq!(snapshot.phase, FeedPhase::Ready);
    assert_eq!(store.stored_progress(&user()), None);

    session.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_flush_saves_both_stores_with_one_timestamp() {
    let store = Arc::new(MemoryFeedStore::with_postings(20));
    let cache = Arc::new(MemoryProgressCache::new());
    let config = FeedConfig {
        debounce_ms: 60_000,
        ..test_config()
    };

    let session = start_feed_session(user(), store.clone(), cache.clone(), config)
        .await
        .unwrap();
    wait_ready(&session).await;

    session.set_index(2).unwrap();
    session.flush(FlushReason::VisibilityLost).unwrap();

    assert!(wait_until(WAIT, || store.stored_progress(&user()).is_some_and(|r| r.index == 2)).await);
    assert!(wait_until(WAIT, || cache.stored(&user()).is_some()).await);
    assert_eq!(cache.stored(&user()), store.stored_progress(&user()));

    session.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_shutdown_flushes_progress() {
    let store = Arc::new(MemoryFeedStore::with_postings(20));
    let cache = Arc::new(MemoryProgressCache::new());
    let config = FeedConfig {
        debounce_ms: 60_000,
        ..test_config()
    };

    let session = start_feed_session(user(), store.clone(), cache.clone(), config)
        .await
        .unwrap();
    wait_ready(&session).await;

    session.set_index(7).unwrap();
    session.shutdown().await.unwrap();

    assert!(wait_until(WAIT, || store.stored_progress(&user()).is_some_and(|r| r.index == 7)).await);
    assert!(wait_until(WAIT, || cache.stored(&user()).is_some_and(|r| r.index == 7)).await);
}

#[tokio::test]
async fn test_save_toggle_persists_and_toggles_back() {
    let store = Arc::new(MemoryFeedStore::with_postings(20));
    let cache = Arc::new(MemoryProgressCache::new());
    let items = store.ordered();

    let session = start_feed_session(user(), store.clone(), cache, test_config())
        .await
        .unwrap();
    wait_ready(&session).await;

    assert!(session.toggle_save(items[0].id).await.unwrap());
    let snapshot = session.snapshot().await.unwrap();
    assert!(snapshot.current_saved);
    assert!(snapshot.current_ui.just_saved);
    assert!(wait_until(WAIT, || store.stored_saved(&user()).contains(&items[0].id)).await);

    assert!(!session.toggle_save(items[0].id).await.unwrap());
    assert!(wait_until(WAIT, || store.stored_saved(&user()).is_empty()).await);
    let snapshot = session.snapshot().await.unwrap();
    assert!(!snapshot.current_saved);
    assert!(!snapshot.current_ui.just_saved);

    session.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_failed_save_reverts_optimistic_state() {
    let store = Arc::new(MemoryFeedStore::with_postings(20));
    let cache = Arc::new(MemoryProgressCache::new());
    let items = store.ordered();

    let session = start_feed_session(user(), store.clone(), cache, test_config())
        .await
        .unwrap();
    wait_ready(&session).await;
    let mut events = session.subscribe();

    store.set_available(false);
    assert!(session.toggle_save(items[0].id).await.unwrap());

    let snapshot = wait_for_snapshot(&session, |s| {
        s.last_error.as_ref().is_some_and(|e| e.source == ErrorSource::Save)
    })
    .await;
    assert!(!snapshot.current_saved);
    assert!(snapshot.saved.is_empty());
    assert!(!snapshot.current_ui.just_saved);

    let mut reverted = false;
    while let Ok(event) = events.try_recv() {
        if let FeedEvent::SaveReverted {
            posting_id, saved, ..
        } = event
        {
            assert_eq!(posting_id, items[0].id);
            assert!(!saved);
            reverted = true;
        }
    }
    assert!(reverted);

    session.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_ui_state_outside_trailing_window_is_discarded() {
    let store = Arc::new(MemoryFeedStore::with_postings(100));
    let cache = Arc::new(MemoryProgressCache::new());

    let session = start_feed_session(user(), store, cache, test_config())
        .await
        .unwrap();
    wait_ready(&session).await;

    for position in 0..30 {
        session.set_details_expanded(position, true).unwrap();
    }

    session.set_index(20).unwrap();
    let snapshot = session.snapshot().await.unwrap();
    assert_eq!(snapshot.retained_positions, (0..30).collect::<Vec<_>>());

    session.set_index(25).unwrap();
    let snapshot = session.snapshot().await.unwrap();
    assert_eq!(snapshot.retained_positions, (5..30).collect::<Vec<_>>());

    session.set_index(45).unwrap();
    let snapshot = wait_for_snapshot(&session, |s| s.index == 45).await;
    assert_eq!(snapshot.retained_positions, (25..30).collect::<Vec<_>>());

    session.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_ui_writes_behind_window_are_ignored() {
    let store = Arc::new(MemoryFeedStore::with_postings(100));
    let cache = Arc::new(MemoryProgressCache::new());
    let items = store.ordered();

    let session = start_feed_session(user(), store, cache, test_config())
        .await
        .unwrap();
    wait_ready(&session).await;

    session.set_index(45).unwrap();
    wait_for_snapshot(&session, |s| s.index == 45).await;

    session.set_details_expanded(0, true).unwrap();
    assert!(session.toggle_save(items[3].id).await.unwrap());
    assert!(session.toggle_save(items[46].id).await.unwrap());

    let snapshot = session.snapshot().await.unwrap();
    assert_eq!(snapshot.retained_positions, vec![46]);
    // Membership is unaffected by the UI window.
    assert_eq!(snapshot.saved.len(), 2);

    session.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_mutations_while_restoring_survive_remote_sets() {
    let store = Arc::new(GatedStore::new(MemoryFeedStore::with_postings(10)));
    let cache = Arc::new(MemoryProgressCache::new());
    let items = store.inner.ordered();

    let earlier: SavedSet = [items[5].id].into_iter().collect();
    store.inner.write_saved_set(&user(), &earlier).await.unwrap();

    let session = start_feed_session(user(), store.clone(), cache, test_config())
        .await
        .unwrap();

    assert!(session.toggle_save(items[0].id).await.unwrap());
    session.dismiss(items[1].id).unwrap();
    assert!(wait_until(WAIT, || store.inner.stored_saved(&user()).contains(&items[0].id)).await);
    assert!(
        wait_until(WAIT, || store.inner.stored_dismissed(&user()).contains(&items[1].id)).await
    );
    assert_eq!(session.snapshot().await.unwrap().phase, FeedPhase::Restoring);

    store.open();
    let snapshot = wait_ready(&session).await;

    let mut expected = vec![items[0].id, items[5].id];
    expected.sort();
    assert_eq!(snapshot.saved, expected);
    assert!(snapshot.current_saved);
    assert_eq!(snapshot.dismissed_count, 1);

    session.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_retry_only_refetches_failed_pages() {
    let store = Arc::new(MemoryFeedStore::with_postings(100));
    let cache = Arc::new(MemoryProgressCache::new());

    let session = start_feed_session(user(), store.clone(), cache, test_config())
        .await
        .unwrap();
    wait_ready(&session).await;
    let requests = store.page_requests();

    // Nothing failed and the index is far from the end.
    session.retry().unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    let snapshot = session.snapshot().await.unwrap();
    assert_eq!(store.page_requests(), requests);
    assert_eq!(snapshot.loaded, 50);

    // A prefetch that fails can be retried once the store is back.
    store.set_available(false);
    session.set_index(21).unwrap();
    wait_for_snapshot(&session, |s| {
        !s.fetching
            && s.last_error.as_ref().is_some_and(|e| e.source == ErrorSource::Pagination)
    })
    .await;

    store.set_available(true);
    session.retry().unwrap();
    let snapshot = wait_for_snapshot(&session, |s| s.loaded == 100).await;
    assert_eq!(snapshot.last_error, None);

    session.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_index_changes_are_broadcast() {
    let store = Arc::new(MemoryFeedStore::with_postings(10));
    let cache = Arc::new(MemoryProgressCache::new());

    let session = start_feed_session(user(), store, cache, test_config())
        .await
        .unwrap();
    wait_ready(&session).await;
    let mut events = session.subscribe();

    session.set_index(1).unwrap();

    let event = tokio::time::timeout(WAIT, async {
        loop {
            if let Ok(FeedEvent::IndexChanged { from, to, .. }) = events.recv().await {
                return (from, to);
            }
        }
    })
    .await
    .unwrap();
    assert_eq!(event, (0, 1));

    session.shutdown().await.unwrap();
}
