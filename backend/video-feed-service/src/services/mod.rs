//! Business logic layer
//!
//! [`VideoFeedService`] wires the cache, store and author resolver into the
//! read and publish paths and is what handlers and neighbouring features hold.

pub mod feed_assembler;
pub mod publish;
pub mod video_resolver;

pub use feed_assembler::FeedAssembler;
pub use publish::{Clock, PublishCoordinator};
pub use video_resolver::VideoResolver;

use crate::config::FeedSettings;
use crate::error::ServiceResult;
use crate::models::{FeedPage, PublishRequest, UserId, VideoId, VideoRecord};
use crate::repository::RecordStore;
use crate::resolver::AuthorResolver;
use feed_cache::FeedCacheOps;
use std::sync::Arc;

#[derive(Clone)]
pub struct VideoFeedService {
    assembler: FeedAssembler,
    publisher: PublishCoordinator,
    videos: VideoResolver,
}

impl VideoFeedService {
    pub fn new(
        cache: Arc<dyn FeedCacheOps>,
        store: Arc<dyn RecordStore>,
        authors: Arc<dyn AuthorResolver>,
        settings: FeedSettings,
    ) -> Self {
        let publisher = PublishCoordinator::new(cache.clone(), store.clone(), settings.clone());
        Self::assemble(cache, store, authors, settings, publisher)
    }

    /// Same as [`VideoFeedService::new`] with a fixed source of publish times
    pub fn with_clock(
        cache: Arc<dyn FeedCacheOps>,
        store: Arc<dyn RecordStore>,
        authors: Arc<dyn AuthorResolver>,
        settings: FeedSettings,
        clock: Clock,
    ) -> Self {
        let publisher = PublishCoordinator::new(cache.clone(), store.clone(), settings.clone())
            .with_clock(clock);
        Self::assemble(cache, store, authors, settings, publisher)
    }

    fn assemble(
        cache: Arc<dyn FeedCacheOps>,
        store: Arc<dyn RecordStore>,
        authors: Arc<dyn AuthorResolver>,
        settings: FeedSettings,
        publisher: PublishCoordinator,
    ) -> Self {
        let videos = VideoResolver::new(cache.clone(), store.clone(), &settings);
        let assembler = FeedAssembler::new(
            cache,
            store,
            authors,
            videos.clone(),
            publisher.clone(),
            settings,
        );
        Self {
            assembler,
            publisher,
            videos,
        }
    }

    pub async fn get_feed(
        &self,
        latest_time_millis: i64,
        max_count: Option<usize>,
    ) -> ServiceResult<FeedPage> {
        self.assembler.get_feed(latest_time_millis, max_count).await
    }

    pub async fn get_published(&self, creator_id: UserId) -> ServiceResult<FeedPage> {
        self.assembler.get_published(creator_id).await
    }

    pub async fn video_ids_by_creator(&self, creator_id: UserId) -> ServiceResult<Vec<VideoId>> {
        self.assembler.video_ids_by_creator(creator_id).await
    }

    pub async fn ensure_global_feed(&self) -> ServiceResult<bool> {
        self.assembler.ensure_global_feed().await
    }

    pub async fn publish(&self, request: PublishRequest) -> ServiceResult<VideoRecord> {
        self.publisher.publish(request).await
    }

    /// Cache-aside lookup of one video; `Ok(None)` when its cached copy is
    /// skipped as corrupt.
    pub async fn resolve_video(&self, video_id: VideoId) -> ServiceResult<Option<VideoRecord>> {
        self.videos.resolve_video(video_id).await
    }

    pub fn publisher(&self) -> &PublishCoordinator {
        &self.publisher
    }
}
