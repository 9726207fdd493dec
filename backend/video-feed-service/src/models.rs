use chrono::{DateTime, TimeZone, Utc};
use feed_cache::{FeedScore, ScoredMember};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

pub type VideoId = i64;
pub type UserId = i64;

/// Hash field names of a cached video
pub mod fields {
    pub const TITLE: &str = "title";
    pub const MEDIA_NAME: &str = "media_name";
    pub const COVER_NAME: &str = "cover_name";
    pub const CREATOR_ID: &str = "creator_id";
    /// Epoch milliseconds
    pub const CREATED_AT: &str = "created_at";
    pub const EXT_INFO: &str = "ext_info";
}

/// Durable video row, immutable once published
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct VideoRecord {
    pub video_id: VideoId,
    pub title: String,
    /// Stored media object name
    pub media_name: String,
    pub cover_name: String,
    pub creator_id: UserId,
    pub created_at: DateTime<Utc>,
    pub ext_info: Option<String>,
}

/// Why a cached video hash could not be turned back into a record
#[derive(Error, Debug, PartialEq, Eq)]
pub enum CachedVideoError {
    #[error("created_at field missing")]
    MissingCreatedAt,

    #[error("created_at field unparsable: {0:?}")]
    InvalidCreatedAt(String),

    #[error("creator_id field missing or unparsable: {0:?}")]
    InvalidCreatorId(Option<String>),
}

impl CachedVideoError {
    /// Timestamp corruption only drops the one video; anything else is fatal.
    pub fn is_timestamp(&self) -> bool {
        matches!(
            self,
            CachedVideoError::MissingCreatedAt | CachedVideoError::InvalidCreatedAt(_)
        )
    }
}

impl VideoRecord {
    /// Sorted-set entry for this video
    pub fn scored_member(&self) -> ScoredMember {
        ScoredMember::new(self.video_id.to_string(), FeedScore::from(self.created_at))
    }

    /// Hash fields for the per-video cache entry (everything except the id)
    pub fn cache_fields(&self) -> Vec<(String, String)> {
        let mut out = vec![
            (fields::TITLE.to_string(), self.title.clone()),
            (fields::MEDIA_NAME.to_string(), self.media_name.clone()),
            (fields::COVER_NAME.to_string(), self.cover_name.clone()),
            (fields::CREATOR_ID.to_string(), self.creator_id.to_string()),
            (
                fields::CREATED_AT.to_string(),
                self.created_at.timestamp_millis().to_string(),
            ),
        ];
        if let Some(ext) = &self.ext_info {
            out.push((fields::EXT_INFO.to_string(), ext.clone()));
        }
        out
    }

    /// Rebuild a record from its cached hash.
    ///
    /// Missing text fields decode as empty strings.
    pub fn from_cache_fields(
        video_id: VideoId,
        cached: &HashMap<String, String>,
    ) -> Result<Self, CachedVideoError> {
        let creator_raw = cached.get(fields::CREATOR_ID);
        let creator_id = creator_raw
            .and_then(|raw| raw.parse::<UserId>().ok())
            .ok_or_else(|| CachedVideoError::InvalidCreatorId(creator_raw.cloned()))?;

        let created_raw = cached
            .get(fields::CREATED_AT)
            .ok_or(CachedVideoError::MissingCreatedAt)?;
        let created_at = created_raw
            .parse::<i64>()
            .ok()
            .and_then(|millis| Utc.timestamp_millis_opt(millis).single())
            .ok_or_else(|| CachedVideoError::InvalidCreatedAt(created_raw.clone()))?;

        let text = |name: &str| cached.get(name).cloned().unwrap_or_default();

        Ok(Self {
            video_id,
            title: text(fields::TITLE),
            media_name: text(fields::MEDIA_NAME),
            cover_name: text(fields::COVER_NAME),
            creator_id,
            created_at,
            ext_info: cached.get(fields::EXT_INFO).cloned(),
        })
    }
}

/// Author profile returned by the entity resolver
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct AuthorRecord {
    pub user_id: UserId,
    pub name: String,
}

/// Result of a feed or publish-list read; `authors[i]` wrote `videos[i]`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedPage {
    pub count: usize,
    pub videos: Vec<VideoRecord>,
    pub authors: Vec<AuthorRecord>,
}

impl FeedPage {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn new(videos: Vec<VideoRecord>, authors: Vec<AuthorRecord>) -> Self {
        Self {
            count: videos.len(),
            videos,
            authors,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

/// Input to a publish; the id comes from the caller's id source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishRequest {
    pub creator_id: UserId,
    pub video_id: VideoId,
    pub media_name: String,
    pub cover_name: String,
    pub title: String,
}
