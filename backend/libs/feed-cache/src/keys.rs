//! Cache key schema
//!
//! - `feed` → global sorted set of every published video
//! - `publish:{creator_id}` → per-creator sorted set
//! - `video:{video_id}` → per-video field hash

/// Key of the global feed sorted set.
pub const GLOBAL_FEED_KEY: &str = "feed";

/// Cache key builder
pub struct CacheKey;

impl CacheKey {
    pub fn global_feed() -> &'static str {
        GLOBAL_FEED_KEY
    }

    /// Format: publish:{creator_id}
    pub fn publish_list(creator_id: i64) -> String {
        format!("publish:{}", creator_id)
    }

    /// Format: video:{video_id}
    pub fn video(video_id: i64) -> String {
        format!("video:{}", video_id)
    }

    /// Entity segment of a key, used as the metrics label.
    pub fn entity_type(key: &str) -> &str {
        match key.split(':').next() {
            Some(entity) if !entity.is_empty() => entity,
            _ => "unknown",
        }
    }
}
