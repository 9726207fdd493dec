//! Feed cache tier
//!
//! Ephemeral sorted-set and hash primitives the video feed is built on:
//! - `feed` and `publish:{creator_id}` sorted sets scored by creation time
//! - `video:{video_id}` hashes holding the video attributes
//! - per-key TTL for sliding expiration
//!
//! The cache is disposable. Everything here can be rebuilt from the record
//! store, so callers treat absence as "never populated" rather than "empty".

mod error;
mod keys;
mod metrics;
mod score;

pub mod memory;

pub use error::{CacheError, CacheResult};
pub use keys::{CacheKey, GLOBAL_FEED_KEY};
pub use memory::{CacheOp, InMemoryFeedCache};
pub use metrics::CacheMetrics;
pub use score::FeedScore;

use redis::{AsyncCommands, RedisError};
use redis_utils::SharedConnectionManager;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Default TTL values (seconds)
pub mod ttl {
    pub const PUBLISH_LIST: u64 = 1800; // 30 minutes
    pub const VIDEO: u64 = 3600; // 1 hour
}

/// One sorted-set entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoredMember {
    pub member: String,
    pub score: FeedScore,
}

impl ScoredMember {
    pub fn new(member: impl Into<String>, score: FeedScore) -> Self {
        Self {
            member: member.into(),
            score,
        }
    }
}

/// Primitives the feed protocol needs from the cache tier
#[async_trait::async_trait]
pub trait FeedCacheOps: Send + Sync {
    /// Presence check, no side effect
    async fn exists(&self, key: &str) -> CacheResult<bool>;

    /// Members with `min <= score <= max`, highest score first
    async fn range_by_score(
        &self,
        key: &str,
        min: FeedScore,
        max: FeedScore,
        offset: usize,
        count: usize,
    ) -> CacheResult<Vec<String>>;

    /// Every member, highest score first
    async fn range_all(&self, key: &str) -> CacheResult<Vec<String>>;

    /// Set or refresh the TTL of an existing key
    async fn expire(&self, key: &str, ttl_secs: u64) -> CacheResult<()>;

    /// All fields of a hash; empty when the key is absent
    async fn get_hash(&self, key: &str) -> CacheResult<HashMap<String, String>>;

    /// Write hash fields and set the key's TTL in one round trip
    async fn set_hash(&self, key: &str, fields: &[(String, String)], ttl_secs: u64)
        -> CacheResult<()>;

    /// Insert-or-update sorted-set entries (idempotent)
    async fn add_members(&self, key: &str, members: &[ScoredMember]) -> CacheResult<()>;

    /// Drop all but the `keep` highest-scored members, returning how many went
    async fn trim_to_newest(&self, key: &str, keep: usize) -> CacheResult<usize>;

    /// Connection health check
    async fn ping(&self) -> CacheResult<()>;
}

/// Redis-backed feed cache
#[derive(Clone)]
pub struct RedisFeedCache {
    redis: SharedConnectionManager,
    metrics: CacheMetrics,
}

impl RedisFeedCache {
    pub fn new(redis: SharedConnectionManager) -> Self {
        Self {
            redis,
            metrics: CacheMetrics::new(),
        }
    }

    pub fn with_metrics(redis: SharedConnectionManager, metrics: CacheMetrics) -> Self {
        Self { redis, metrics }
    }

    fn redis_error(&self, key: &str, op: &str, e: RedisError) -> CacheError {
        warn!(key = %key, op = op, error = %e, "Redis command failed");
        self.metrics.record_error(key, op);
        CacheError::Redis(e)
    }
}

#[async_trait::async_trait]
impl FeedCacheOps for RedisFeedCache {
    async fn exists(&self, key: &str) -> CacheResult<bool> {
        let mut conn = self.redis.lock().await;
        let exists: bool = conn
            .exists(key)
            .await
            .map_err(|e| self.redis_error(key, "exists", e))?;

        if exists {
            self.metrics.record_hit(key);
        } else {
            self.metrics.record_miss(key);
        }
        Ok(exists)
    }

    async fn range_by_score(
        &self,
        key: &str,
        min: FeedScore,
        max: FeedScore,
        offset: usize,
        count: usize,
    ) -> CacheResult<Vec<String>> {
        if count == 0 {
            return Ok(Vec::new());
        }

        let mut conn = self.redis.lock().await;
        let members: Vec<String> = redis::cmd("ZREVRANGEBYSCORE")
            .arg(key)
            .arg(max.to_string())
            .arg(min.to_string())
            .arg("LIMIT")
            .arg(offset)
            .arg(count)
            .query_async(&mut *conn)
            .await
            .map_err(|e| self.redis_error(key, "zrevrangebyscore", e))?;

        debug!(key = %key, min = %min, max = %max, returned = members.len(), "Range by score");
        Ok(members)
    }

    async fn range_all(&self, key: &str) -> CacheResult<Vec<String>> {
        let mut conn = self.redis.lock().await;
        let members: Vec<String> = redis::cmd("ZREVRANGE")
            .arg(key)
            .arg(0)
            .arg(-1)
            .query_async(&mut *conn)
            .await
            .map_err(|e| self.redis_error(key, "zrevrange", e))?;
        Ok(members)
    }

    async fn expire(&self, key: &str, ttl_secs: u64) -> CacheResult<()> {
        let mut conn = self.redis.lock().await;
        redis::cmd("EXPIRE")
            .arg(key)
            .arg(ttl_secs)
            .query_async::<_, ()>(&mut *conn)
            .await
            .map_err(|e| self.redis_error(key, "expire", e))?;
        Ok(())
    }

    async fn get_hash(&self, key: &str) -> CacheResult<HashMap<String, String>> {
        let mut conn = self.redis.lock().await;
        let fields: HashMap<String, String> = conn
            .hgetall(key)
            .await
            .map_err(|e| self.redis_error(key, "hgetall", e))?;
        Ok(fields)
    }

    async fn set_hash(
        &self,
        key: &str,
        fields: &[(String, String)],
        ttl_secs: u64,
    ) -> CacheResult<()> {
        if fields.is_empty() {
            return Err(CacheError::InvalidData(format!(
                "refusing to write empty hash at {}",
                key
            )));
        }

        let mut conn = self.redis.lock().await;
        let mut pipe = redis::pipe();
        pipe.atomic()
            .cmd("HSET")
            .arg(key)
            .arg(fields)
            .ignore()
            .cmd("EXPIRE")
            .arg(key)
            .arg(ttl_secs)
            .ignore();
        pipe.query_async::<_, ()>(&mut *conn)
            .await
            .map_err(|e| self.redis_error(key, "hset", e))?;

        debug!(key = %key, fields = fields.len(), ttl = ttl_secs, "Cache hash set");
        self.metrics.record_write(key);
        Ok(())
    }

    async fn add_members(&self, key: &str, members: &[ScoredMember]) -> CacheResult<()> {
        if members.is_empty() {
            return Ok(());
        }

        let mut cmd = redis::cmd("ZADD");
        cmd.arg(key);
        for entry in members {
            cmd.arg(entry.score.to_string()).arg(&entry.member);
        }

        let mut conn = self.redis.lock().await;
        cmd.query_async::<_, ()>(&mut *conn)
            .await
            .map_err(|e| self.redis_error(key, "zadd", e))?;

        debug!(key = %key, count = members.len(), "Sorted set members added");
        self.metrics.record_write(key);
        Ok(())
    }

    async fn trim_to_newest(&self, key: &str, keep: usize) -> CacheResult<usize> {
        let stop = -(keep as i64) - 1;
        let mut conn = self.redis.lock().await;
        let removed: usize = redis::cmd("ZREMRANGEBYRANK")
            .arg(key)
            .arg(0)
            .arg(stop)
            .query_async(&mut *conn)
            .await
            .map_err(|e| self.redis_error(key, "zremrangebyrank", e))?;

        if removed > 0 {
            debug!(key = %key, removed = removed, keep = keep, "Trimmed sorted set");
        }
        Ok(removed)
    }

    async fn ping(&self) -> CacheResult<()> {
        let mut conn = self.redis.lock().await;
        redis::cmd("PING")
            .query_async::<_, String>(&mut *conn)
            .await
            .map_err(|e| self.redis_error("ping", "ping", e))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scored_member_new() {
        let entry = ScoredMember::new("42", FeedScore::from_millis(1_500));
        assert_eq!(entry.member, "42");
        assert_eq!(entry.score.to_string(), "1.500");
    }

    #[test]
    fn test_default_ttls() {
        assert_eq!(ttl::PUBLISH_LIST, 1800);
        assert_eq!(ttl::VIDEO, 3600);
    }
}
