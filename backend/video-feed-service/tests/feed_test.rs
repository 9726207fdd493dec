mod common;

use common::*;
use feed_cache::{CacheOp, FeedCacheOps, FeedScore, ScoredMember};
use video_feed_service::{FeedSettings, ServiceError};

const T1_MILLIS: i64 = T0_MILLIS + 5_000;

async fn two_videos(settings: FeedSettings) -> Harness {
    let h = Harness::with(MemoryStore::new(), settings);
    h.service.publish(request(1, 7)).await.unwrap();
    h.clock.set(T1_MILLIS);
    h.service.publish(request(2, 7)).await.unwrap();
    h
}

#[tokio::test]
async fn test_feed_returns_newest_first_with_authors() {
    let h = two_videos(FeedSettings::default()).await;

    let page = h.service.get_feed(T1_MILLIS + 2_000, Some(10)).await.unwrap();

    assert_eq!(page.count, 2);
    assert_eq!(ids(&page.videos), vec![2, 1]);
    assert_eq!(page.authors, vec![author(7), author(7)]);
    assert_eq!(h.authors.calls(), vec![vec![7]]);
}

#[tokio::test]
async fn test_cursor_excludes_boundary_video() {
    let h = two_videos(FeedSettings::default()).await;

    let page = h.service.get_feed(T1_MILLIS + 2, Some(10)).await.unwrap();
    assert_eq!(ids(&page.videos), vec![2, 1]);

    let page = h.service.get_feed(T1_MILLIS + 1, Some(10)).await.unwrap();
    assert_eq!(ids(&page.videos), vec![1]);

    let page = h.service.get_feed(T0_MILLIS + 1, Some(10)).await.unwrap();
    assert!(page.is_empty());
}

#[tokio::test]
async fn test_default_page_size() {
    let settings = FeedSettings {
        page_size: 1,
        ..FeedSettings::default()
    };
    let h = two_videos(settings).await;

    let page = h.service.get_feed(T1_MILLIS + 2_000, None).await.unwrap();
    assert_eq!(ids(&page.videos), vec![2]);
}

#[tokio::test]
async fn test_empty_feed_skips_author_lookup() {
    let h = Harness::new();

    let page = h.service.get_feed(T0_MILLIS, Some(10)).await.unwrap();
    assert!(page.is_empty());
    assert!(page.authors.is_empty());
    assert!(h.authors.calls().is_empty());
}

#[tokio::test]
async fn test_range_failure_reads_as_end_of_feed() {
    let h = two_videos(FeedSettings::default()).await;
    h.cache.fail(CacheOp::RangeByScore).await;

    let page = h.service.get_feed(T1_MILLIS + 2_000, Some(10)).await.unwrap();
    assert!(page.is_empty());
}

#[tokio::test]
async fn test_unresolvable_video_fails_whole_page() {
    let h = two_videos(FeedSettings::default()).await;
    h.cache
        .add_members("feed", &[ScoredMember::new("999", FeedScore::from_millis(T0_MILLIS + 1))])
        .await
        .unwrap();

    let err = h.service.get_feed(T1_MILLIS + 2_000, Some(10)).await.unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));
}

#[tokio::test]
async fn test_unparsable_member_is_skipped() {
    let h = two_videos(FeedSettings::default()).await;
    h.cache
        .add_members("feed", &[ScoredMember::new("not-a-video", FeedScore::from_millis(T0_MILLIS + 1))])
        .await
        .unwrap();

    let page = h.service.get_feed(T1_MILLIS + 2_000, Some(10)).await.unwrap();
    assert_eq!(ids(&page.videos), vec![2, 1]);
}

#[tokio::test]
async fn test_corrupt_created_at_is_skipped() {
    let h = two_videos(FeedSettings::default()).await;
    h.cache.corrupt_field("video:1", "created_at", Some("yesterday")).await;

    let page = h.service.get_feed(T1_MILLIS + 2_000, Some(10)).await.unwrap();
    assert_eq!(ids(&page.videos), vec![2]);
    assert_eq!(page.authors.len(), 1);
}

#[tokio::test]
async fn test_missing_created_at_is_skipped() {
    let h = two_videos(FeedSettings::default()).await;
    h.cache.corrupt_field("video:2", "created_at", None).await;

    let page = h.service.get_feed(T1_MILLIS + 2_000, Some(10)).await.unwrap();
    assert_eq!(ids(&page.videos), vec![1]);
}

#[tokio::test]
async fn test_corrupt_created_at_fails_in_strict_mode() {
    let settings = FeedSettings {
        strict_created_at: true,
        ..FeedSettings::default()
    };
    let h = two_videos(settings).await;
    h.cache.corrupt_field("video:1", "created_at", Some("")).await;

    let err = h.service.get_feed(T1_MILLIS + 2_000, Some(10)).await.unwrap_err();
    assert!(matches!(err, ServiceError::Internal(_)));
}

#[tokio::test]
async fn test_missing_author_fails_page() {
    let h = two_videos(FeedSettings::default()).await;
    h.authors.forget(7);

    let err = h.service.get_feed(T1_MILLIS + 2_000, Some(10)).await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_expired_hash_reloaded_from_store() {
    let h = two_videos(FeedSettings::default()).await;
    h.cache.advance(3_600).await;
    assert!(h.cache.hash("video:1").await.is_none());

    let page = h.service.get_feed(T1_MILLIS + 2_000, Some(10)).await.unwrap();
    assert_eq!(ids(&page.videos), vec![2, 1]);
    assert_eq!(h.store.calls("find_by_id"), 2);
    assert_eq!(h.cache.ttl("video:1").await, Some(3_600));
}

#[tokio::test]
async fn test_ensure_global_feed_seeds_once() {
    let store = MemoryStore::with_rows(vec![
        video(1, 7, T0_MILLIS),
        video(2, 8, T1_MILLIS),
    ]);
    let h = Harness::with(store, FeedSettings::default());

    assert!(h.service.ensure_global_feed().await.unwrap());
    assert!(!h.service.ensure_global_feed().await.unwrap());
    assert_eq!(h.store.calls("find_all"), 1);

    let page = h.service.get_feed(T1_MILLIS + 2_000, Some(10)).await.unwrap();
    assert_eq!(ids(&page.videos), vec![2, 1]);
    assert_eq!(page.authors, vec![author(8), author(7)]);
}

#[tokio::test]
async fn test_ensure_global_feed_with_empty_store() {
    let h = Harness::new();

    assert!(!h.service.ensure_global_feed().await.unwrap());
    assert_eq!(h.store.calls("find_all"), 1);
    assert!(!h.cache.exists("feed").await.unwrap());
}

#[tokio::test]
async fn test_cold_cache_feed_rebuilt_from_store() {
    let store = MemoryStore::with_rows(vec![
        video(1, 7, T0_MILLIS),
        video(2, 7, T1_MILLIS),
    ]);
    let h = Harness::with(store, FeedSettings::default());

    let page = h.service.get_feed(T0_MILLIS + 10_000, Some(10)).await.unwrap();

    assert_eq!(ids(&page.videos), vec![2, 1]);
    assert_eq!(h.store.calls("find_all"), 1);
    assert!(h.cache.exists("feed").await.unwrap());

    h.service.get_feed(T0_MILLIS + 10_000, Some(10)).await.unwrap();
    assert_eq!(h.store.calls("find_all"), 1);
}

#[tokio::test]
async fn test_evicted_feed_rebuilt_on_read() {
    let h = Harness::new();
    h.service.publish(request(1, 7)).await.unwrap();
    h.cache.evict("feed").await;

    let page = h.service.get_feed(T0_MILLIS + 10_000, Some(10)).await.unwrap();
    assert_eq!(ids(&page.videos), vec![1]);
}

#[tokio::test]
async fn test_feed_existence_failure_still_pages_cache() {
    let h = two_videos(FeedSettings::default()).await;
    h.cache.fail(CacheOp::Exists).await;

    let page = h.service.get_feed(T1_MILLIS + 2_000, Some(10)).await.unwrap();
    assert_eq!(ids(&page.videos), vec![2, 1]);
}

#[tokio::test]
async fn test_feed_rebuild_store_failure_is_fatal() {
    let h = Harness::new();
    h.store.fail("find_all");

    let err = h.service.get_feed(T0_MILLIS, Some(10)).await.unwrap_err();
    assert!(err.is_storage());
}
