//! Single-video lookup with cache-aside semantics
//!
//! Shared by feed assembly and by neighbouring features (comments, likes) that
//! need one video at a time.

use crate::config::FeedSettings;
use crate::error::{ServiceError, ServiceResult};
use crate::models::{VideoId, VideoRecord};
use crate::repository::RecordStore;
use feed_cache::{CacheError, CacheKey, FeedCacheOps};
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Clone)]
pub struct VideoResolver {
    cache: Arc<dyn FeedCacheOps>,
    store: Arc<dyn RecordStore>,
    video_ttl_secs: u64,
    strict_created_at: bool,
}

impl VideoResolver {
    pub fn new(
        cache: Arc<dyn FeedCacheOps>,
        store: Arc<dyn RecordStore>,
        settings: &FeedSettings,
    ) -> Self {
        Self {
            cache,
            store,
            video_ttl_secs: settings.video_ttl_secs,
            strict_created_at: settings.strict_created_at,
        }
    }

    /// Resolve one video.
    ///
    /// `Ok(None)` means the cached copy has a corrupt `created_at` and the
    /// video is skipped. A video absent from the store is `NotFound`.
    pub async fn resolve_video(&self, video_id: VideoId) -> ServiceResult<Option<VideoRecord>> {
        let key = CacheKey::video(video_id);

        if self.cache.exists(&key).await? {
            if let Err(e) = self.cache.expire(&key, self.video_ttl_secs).await {
                warn!(video_id = video_id, error = %e, "Failed to refresh video hash TTL");
            }

            let cached = self.cache.get_hash(&key).await?;
            if !cached.is_empty() {
                return match VideoRecord::from_cache_fields(video_id, &cached) {
                    Ok(video) => Ok(Some(video)),
                    Err(e) if e.is_timestamp() && !self.strict_created_at => {
                        warn!(video_id = video_id, error = %e, "Skipping video with corrupt cached timestamp");
                        Ok(None)
                    }
                    Err(e) if e.is_timestamp() => Err(ServiceError::Internal(format!(
                        "video {}: {}",
                        video_id, e
                    ))),
                    Err(e) => Err(ServiceError::Cache(CacheError::InvalidData(format!(
                        "video {}: {}",
                        video_id, e
                    )))),
                };
            }
            // Expired between EXISTS and HGETALL.
            debug!(video_id = video_id, "Video hash vanished, reading store");
        }

        let video = self.store.find_by_id(video_id).await?;
        if let Err(e) = self.cache_video(&video).await {
            warn!(video_id = video_id, error = %e, "Video hash write-through failed");
        }
        Ok(Some(video))
    }

    /// Resolve in order; the first missing video fails the whole batch.
    pub async fn resolve_all(&self, video_ids: &[VideoId]) -> ServiceResult<Vec<VideoRecord>> {
        let mut videos = Vec::with_capacity(video_ids.len());
        for &video_id in video_ids {
            if let Some(video) = self.resolve_video(video_id).await? {
                videos.push(video);
            }
        }
        Ok(videos)
    }

    /// Write the per-video hash with a fresh TTL
    pub async fn cache_video(&self, video: &VideoRecord) -> ServiceResult<()> {
        self.cache
            .set_hash(
                &CacheKey::video(video.video_id),
                &video.cache_fields(),
                self.video_ttl_secs,
            )
            .await?;
        Ok(())
    }
}
