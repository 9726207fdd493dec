#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use feed_cache::{FeedCacheOps, InMemoryFeedCache};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use video_feed_service::models::{AuthorRecord, PublishRequest, UserId, VideoId, VideoRecord};
use video_feed_service::repository::RecordStore;
use video_feed_service::resolver::AuthorResolver;
use video_feed_service::services::Clock;
use video_feed_service::{FeedSettings, ServiceError, ServiceResult, VideoFeedService};

/// Epoch millis used as the first publish time in tests
pub const T0_MILLIS: i64 = 1_700_000_000_123;

#[derive(Default)]
struct StoreState {
    rows: Vec<VideoRecord>,
    calls: HashMap<&'static str, usize>,
    failing: HashSet<&'static str>,
}

/// Record store backed by a Vec
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<StoreState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rows(rows: Vec<VideoRecord>) -> Self {
        let store = Self::default();
        store.state.lock().unwrap().rows = rows;
        store
    }

    pub fn calls(&self, op: &'static str) -> usize {
        self.state.lock().unwrap().calls.get(op).copied().unwrap_or(0)
    }

    pub fn fail(&self, op: &'static str) {
        self.state.lock().unwrap().failing.insert(op);
    }

    pub fn len(&self) -> usize {
        self.state.lock().unwrap().rows.len()
    }

    fn enter(&self, op: &'static str) -> ServiceResult<std::sync::MutexGuard<'_, StoreState>> {
        let mut state = self.state.lock().unwrap();
        *state.calls.entry(op).or_insert(0) += 1;
        if state.failing.contains(op) {
            return Err(ServiceError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(state)
    }
}

fn newest_first(mut rows: Vec<VideoRecord>) -> Vec<VideoRecord> {
    rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    rows
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn insert(&self, video: &VideoRecord) -> ServiceResult<()> {
        self.enter("insert")?.rows.push(video.clone());
        Ok(())
    }

    async fn find_by_id(&self, video_id: VideoId) -> ServiceResult<VideoRecord> {
        self.enter("find_by_id")?
            .rows
            .iter()
            .find(|v| v.video_id == video_id)
            .cloned()
            .ok_or_else(|| ServiceError::NotFound(format!("video {}", video_id)))
    }

    async fn find_by_creator(&self, creator_id: UserId) -> ServiceResult<Vec<VideoRecord>> {
        let rows = self
            .enter("find_by_creator")?
            .rows
            .iter()
            .filter(|v| v.creator_id == creator_id)
            .cloned()
            .collect();
        Ok(newest_first(rows))
    }

    async fn find_all(&self) -> ServiceResult<Vec<VideoRecord>> {
        let rows = self.enter("find_all")?.rows.clone();
        Ok(newest_first(rows))
    }
}

/// Resolves every creator id to `user-{id}`, answering in reverse order
#[derive(Clone, Default)]
pub struct StaticAuthors {
    unknown: Arc<Mutex<HashSet<UserId>>>,
    calls: Arc<Mutex<Vec<Vec<UserId>>>>,
}

impl StaticAuthors {
    pub fn forget(&self, user_id: UserId) {
        self.unknown.lock().unwrap().insert(user_id);
    }

    pub fn calls(&self) -> Vec<Vec<UserId>> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl AuthorResolver for StaticAuthors {
    async fn resolve_batch(&self, creator_ids: &[UserId]) -> ServiceResult<Vec<AuthorRecord>> {
        self.calls.lock().unwrap().push(creator_ids.to_vec());
        let unknown = self.unknown.lock().unwrap();
        Ok(creator_ids
            .iter()
            .rev()
            .filter(|id| !unknown.contains(id))
            .map(|id| author(*id))
            .collect())
    }
}

pub fn author(user_id: UserId) -> AuthorRecord {
    AuthorRecord {
        user_id,
        name: format!("user-{}", user_id),
    }
}

pub fn at(millis: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(millis).unwrap()
}

pub fn video(video_id: VideoId, creator_id: UserId, created_millis: i64) -> VideoRecord {
    VideoRecord {
        video_id,
        title: format!("title {}", video_id),
        media_name: format!("media-{}.mp4", video_id),
        cover_name: format!("cover-{}.jpg", video_id),
        creator_id,
        created_at: at(created_millis),
        ext_info: None,
    }
}

pub fn request(video_id: VideoId, creator_id: UserId) -> PublishRequest {
    PublishRequest {
        creator_id,
        video_id,
        media_name: format!("media-{}.mp4", video_id),
        cover_name: format!("cover-{}.jpg", video_id),
        title: format!("title {}", video_id),
    }
}

/// Clock the test moves by hand
#[derive(Clone)]
pub struct ManualClock(Arc<AtomicI64>);

impl ManualClock {
    pub fn starting_at(millis: i64) -> Self {
        Self(Arc::new(AtomicI64::new(millis)))
    }

    pub fn set(&self, millis: i64) {
        self.0.store(millis, Ordering::SeqCst);
    }

    pub fn clock(&self) -> Clock {
        let now = self.0.clone();
        Arc::new(move || at(now.load(Ordering::SeqCst)))
    }
}

pub struct Harness {
    pub cache: InMemoryFeedCache,
    pub store: MemoryStore,
    pub authors: StaticAuthors,
    pub clock: ManualClock,
    pub service: VideoFeedService,
}

impl Harness {
    pub fn new() -> Self {
        Self::with(MemoryStore::new(), FeedSettings::default())
    }

    pub fn with(store: MemoryStore, settings: FeedSettings) -> Self {
        let cache = InMemoryFeedCache::new();
        let authors = StaticAuthors::default();
        let clock = ManualClock::starting_at(T0_MILLIS);
        let service = VideoFeedService::with_clock(
            Arc::new(cache.clone()) as Arc<dyn FeedCacheOps>,
            Arc::new(store.clone()),
            Arc::new(authors.clone()),
            settings,
            clock.clock(),
        );
        Self {
            cache,
            store,
            authors,
            clock,
            service,
        }
    }
}

pub fn ids(videos: &[VideoRecord]) -> Vec<VideoId> {
    videos.iter().map(|v| v.video_id).collect()
}
