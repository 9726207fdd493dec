//! Publish path: store first, then propagate into the cache
//!
//! A publish event writes every video hash before any sorted-set member, so a
//! reader walking `feed` or `publish:{creator_id}` never meets a member whose
//! hash has not been written yet.

use crate::config::FeedSettings;
use crate::error::ServiceResult;
use crate::models::{PublishRequest, UserId, VideoRecord};
use crate::repository::RecordStore;
use chrono::{DateTime, TimeZone, Utc};
use feed_cache::{CacheKey, CacheMetrics, FeedCacheOps, ScoredMember};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Source of publish timestamps
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

#[derive(Clone)]
pub struct PublishCoordinator {
    cache: Arc<dyn FeedCacheOps>,
    store: Arc<dyn RecordStore>,
    settings: FeedSettings,
    clock: Clock,
    metrics: CacheMetrics,
}

impl PublishCoordinator {
    pub fn new(
        cache: Arc<dyn FeedCacheOps>,
        store: Arc<dyn RecordStore>,
        settings: FeedSettings,
    ) -> Self {
        Self {
            cache,
            store,
            settings,
            clock: Arc::new(Utc::now),
            metrics: CacheMetrics::new(),
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Publish instant at millisecond precision, the precision the cache keeps.
    fn now(&self) -> DateTime<Utc> {
        let now = (self.clock)();
        Utc.timestamp_millis_opt(now.timestamp_millis())
            .single()
            .unwrap_or(now)
    }

    /// Store the video, then add it to the creator's list and the global feed.
    ///
    /// A missing `publish:{creator_id}` is rebuilt from the store, which
    /// already holds the new row; otherwise only the new member is appended.
    pub async fn publish(&self, request: PublishRequest) -> ServiceResult<VideoRecord> {
        let video = VideoRecord {
            video_id: request.video_id,
            title: request.title,
            media_name: request.media_name,
            cover_name: request.cover_name,
            creator_id: request.creator_id,
            created_at: self.now(),
            ext_info: None,
        };

        if let Err(e) = self.store.insert(&video).await {
            error!(video_id = video.video_id, creator_id = video.creator_id, error = %e, "Video insert failed");
            return Err(e);
        }

        let key = CacheKey::publish_list(video.creator_id);
        let list_present = match self.cache.exists(&key).await {
            Ok(present) => present,
            Err(e) => {
                warn!(key = %key, error = %e, "Publish list existence check failed, rebuilding");
                false
            }
        };

        if list_present {
            self.publish_event(video.creator_id, std::slice::from_ref(&video))
                .await?;
            debug!(video_id = video.video_id, "Appended video to cached publish list");
        } else {
            let videos = self.store.find_by_creator(video.creator_id).await?;
            self.seed_creator(video.creator_id, &videos).await?;
        }

        info!(
            video_id = video.video_id,
            creator_id = video.creator_id,
            rebuilt = !list_present,
            "Video published"
        );
        Ok(video)
    }

    /// Bulk path: seed `publish:{creator_id}` with every given video.
    pub async fn seed_creator(&self, creator_id: UserId, videos: &[VideoRecord]) -> ServiceResult<()> {
        if videos.is_empty() {
            return Ok(());
        }

        let key = CacheKey::publish_list(creator_id);
        self.metrics.record_rebuild(&key);
        self.publish_event(creator_id, videos).await?;

        info!(creator_id = creator_id, count = videos.len(), "Seeded publish list");
        Ok(())
    }

    /// Hashes first, then members of `publish:{creator_id}` and `feed`.
    pub async fn publish_event(&self, creator_id: UserId, videos: &[VideoRecord]) -> ServiceResult<()> {
        if videos.is_empty() {
            return Ok(());
        }

        self.write_hashes(videos).await?;

        let members: Vec<ScoredMember> = videos.iter().map(VideoRecord::scored_member).collect();
        let key = CacheKey::publish_list(creator_id);
        self.cache.add_members(&key, &members).await?;
        if let Err(e) = self
            .cache
            .expire(&key, self.settings.publish_list_ttl_secs)
            .await
        {
            warn!(key = %key, error = %e, "Failed to set publish list TTL");
        }

        self.add_to_global_feed(&members).await
    }

    /// Seed `feed` from every stored video. Returns how many were written.
    pub async fn rebuild_global_feed(&self) -> ServiceResult<usize> {
        let videos = self.store.find_all().await?;
        if videos.is_empty() {
            debug!("No videos stored, global feed left unpopulated");
            return Ok(0);
        }

        self.metrics.record_rebuild(CacheKey::global_feed());
        self.write_hashes(&videos).await?;
        let members: Vec<ScoredMember> = videos.iter().map(VideoRecord::scored_member).collect();
        self.write_global_members(&members).await?;

        info!(count = videos.len(), "Rebuilt global feed");
        Ok(videos.len())
    }

    async fn write_hashes(&self, videos: &[VideoRecord]) -> ServiceResult<()> {
        for video in videos {
            self.cache
                .set_hash(
                    &CacheKey::video(video.video_id),
                    &video.cache_fields(),
                    self.settings.video_ttl_secs,
                )
                .await?;
        }
        Ok(())
    }

    /// An unpopulated `feed` is rebuilt whole rather than started with only
    /// these members, which would hide every older video.
    async fn add_to_global_feed(&self, members: &[ScoredMember]) -> ServiceResult<()> {
        let feed_key = CacheKey::global_feed();
        let feed_present = match self.cache.exists(feed_key).await {
            Ok(present) => present,
            Err(e) => {
                warn!(error = %e, "Global feed existence check failed, appending");
                true
            }
        };

        if feed_present {
            self.write_global_members(members).await
        } else {
            self.rebuild_global_feed().await.map(|_| ())
        }
    }

    async fn write_global_members(&self, members: &[ScoredMember]) -> ServiceResult<()> {
        let feed_key = CacheKey::global_feed();
        self.cache.add_members(feed_key, members).await?;

        if let Some(max_len) = self.settings.global_feed_max_len {
            match self.cache.trim_to_newest(feed_key, max_len).await {
                Ok(removed) if removed > 0 => {
                    debug!(removed = removed, max_len = max_len, "Trimmed global feed");
                }
                Ok(_) => {}
                Err(e) => warn!(error = %e, "Global feed trim failed"),
            }
        }
        Ok(())
    }
}
