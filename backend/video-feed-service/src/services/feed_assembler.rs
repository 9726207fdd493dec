//! Read side: global feed pagination and per-creator listings

use crate::config::FeedSettings;
use crate::error::ServiceResult;
use crate::models::{FeedPage, UserId, VideoId, VideoRecord};
use crate::repository::RecordStore;
use crate::resolver::{authors_for, AuthorResolver};
use crate::services::publish::PublishCoordinator;
use crate::services::video_resolver::VideoResolver;
use feed_cache::{CacheKey, FeedCacheOps, FeedScore};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Cursor offset that keeps the boundary video off the next page.
const CURSOR_EXCLUSION_MILLIS: i64 = 2;

/// Result of reading a creator's publish list.
enum PublishList {
    /// Rebuilt from the store; rows are authoritative for this call.
    Loaded(Vec<VideoRecord>),
    /// Served from the cache, newest first.
    Cached(Vec<VideoId>),
}

#[derive(Clone)]
pub struct FeedAssembler {
    cache: Arc<dyn FeedCacheOps>,
    store: Arc<dyn RecordStore>,
    authors: Arc<dyn AuthorResolver>,
    videos: VideoResolver,
    publisher: PublishCoordinator,
    settings: FeedSettings,
}

impl FeedAssembler {
    pub fn new(
        cache: Arc<dyn FeedCacheOps>,
        store: Arc<dyn RecordStore>,
        authors: Arc<dyn AuthorResolver>,
        videos: VideoResolver,
        publisher: PublishCoordinator,
        settings: FeedSettings,
    ) -> Self {
        Self {
            cache,
            store,
            authors,
            videos,
            publisher,
            settings,
        }
    }

    /// One page of the global feed, newest first, strictly older than
    /// `latest_time_millis`. An empty page ends pagination.
    pub async fn get_feed(
        &self,
        latest_time_millis: i64,
        max_count: Option<usize>,
    ) -> ServiceResult<FeedPage> {
        match self.ensure_global_feed().await {
            Ok(_) => {}
            Err(e) if e.is_cache() => {
                warn!(error = %e, "Global feed seeding check failed, paging cache as is");
            }
            Err(e) => return Err(e),
        }

        let count = max_count.unwrap_or(self.settings.page_size);
        let max = FeedScore::from_millis(latest_time_millis.saturating_sub(CURSOR_EXCLUSION_MILLIS));

        let members = match self
            .cache
            .range_by_score(CacheKey::global_feed(), FeedScore::ZERO, max, 0, count)
            .await
        {
            Ok(members) => members,
            Err(e) => {
                warn!(latest_time = latest_time_millis, error = %e, "Global feed range query failed");
                return Ok(FeedPage::empty());
            }
        };

        if members.is_empty() {
            debug!(latest_time = latest_time_millis, "Global feed exhausted");
            return Ok(FeedPage::empty());
        }

        let ids = parse_members(CacheKey::global_feed(), &members);
        let videos = self.videos.resolve_all(&ids).await?;
        self.page(videos).await
    }

    /// Seed `feed` from the store when it has never been populated.
    /// Returns whether a rebuild ran.
    pub async fn ensure_global_feed(&self) -> ServiceResult<bool> {
        if self.cache.exists(CacheKey::global_feed()).await? {
            return Ok(false);
        }

        let seeded = self.publisher.rebuild_global_feed().await?;
        Ok(seeded > 0)
    }

    /// Every video of one creator, newest first
    pub async fn get_published(&self, creator_id: UserId) -> ServiceResult<FeedPage> {
        let videos = match self.load_publish_list(creator_id).await? {
            PublishList::Loaded(videos) => videos,
            PublishList::Cached(ids) => self.videos.resolve_all(&ids).await?,
        };

        if videos.is_empty() {
            return Ok(FeedPage::empty());
        }
        self.page(videos).await
    }

    /// Ids of one creator's videos, newest first
    pub async fn video_ids_by_creator(&self, creator_id: UserId) -> ServiceResult<Vec<VideoId>> {
        Ok(match self.load_publish_list(creator_id).await? {
            PublishList::Loaded(videos) => videos.iter().map(|v| v.video_id).collect(),
            PublishList::Cached(ids) => ids,
        })
    }

    async fn page(&self, videos: Vec<VideoRecord>) -> ServiceResult<FeedPage> {
        let authors = authors_for(self.authors.as_ref(), &videos).await?;
        Ok(FeedPage::new(videos, authors))
    }

    async fn load_publish_list(&self, creator_id: UserId) -> ServiceResult<PublishList> {
        let key = CacheKey::publish_list(creator_id);

        let present = match self.cache.exists(&key).await {
            Ok(present) => present,
            Err(e) => {
                warn!(key = %key, error = %e, "Publish list existence check failed, reading store");
                false
            }
        };

        if present {
            if let Err(e) = self
                .cache
                .expire(&key, self.settings.publish_list_ttl_secs)
                .await
            {
                warn!(key = %key, error = %e, "Failed to refresh publish list TTL");
            }
            let members = self.cache.range_all(&key).await?;
            return Ok(PublishList::Cached(parse_members(&key, &members)));
        }

        let mut videos = self.store.find_by_creator(creator_id).await?;
        if videos.is_empty() {
            debug!(creator_id = creator_id, "Creator has no videos");
            return Ok(PublishList::Loaded(videos));
        }

        // Equal scores fall back to member string order, as ZREVRANGE does.
        videos.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.video_id.to_string().cmp(&a.video_id.to_string()))
        });
        self.publisher.seed_creator(creator_id, &videos).await?;

        info!(creator_id = creator_id, count = videos.len(), "Publish list rebuilt from store");
        Ok(PublishList::Loaded(videos))
    }
}

/// Members that are not video ids are dropped.
fn parse_members(key: &str, members: &[String]) -> Vec<VideoId> {
    members
        .iter()
        .filter_map(|member| match member.parse::<VideoId>() {
            Ok(id) => Some(id),
            Err(_) => {
                warn!(key = %key, member = %member, "Skipping unparsable feed member");
                None
            }
        })
        .collect()
}
