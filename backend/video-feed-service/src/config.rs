/// Configuration management for the video feed service
///
/// Loads configuration from environment variables.
use anyhow::{Context, Result};
use db_pool::env_utils::{parse_env_flag, parse_env_optional, parse_env_with_default};
use serde::{Deserialize, Serialize};

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub redis: RedisConfig,
    pub feed: FeedSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application environment (dev, staging, prod)
    pub env: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    pub url: String,
    /// Seconds between keep-alive PINGs
    #[serde(default = "default_health_interval_secs")]
    pub health_interval_secs: u64,
}

/// Knobs of the feed/publish cache protocol
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedSettings {
    /// Videos per global feed page when the caller gives no count
    pub page_size: usize,
    /// Sliding TTL of `publish:{creator_id}`
    pub publish_list_ttl_secs: u64,
    /// TTL of `video:{video_id}`, refreshed on each cached read
    pub video_ttl_secs: u64,
    /// Keep only the newest N members of `feed`; `None` leaves it unbounded
    pub global_feed_max_len: Option<usize>,
    /// Fail instead of skipping a video whose cached `created_at` is corrupt
    pub strict_created_at: bool,
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self {
            page_size: 10,
            publish_list_ttl_secs: feed_cache::ttl::PUBLISH_LIST,
            video_ttl_secs: feed_cache::ttl::VIDEO,
            global_feed_max_len: None,
            strict_created_at: false,
        }
    }
}

impl FeedSettings {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            page_size: parse_env_with_default("FEED_PAGE_SIZE", defaults.page_size).max(1),
            publish_list_ttl_secs: parse_env_with_default(
                "PUBLISH_LIST_TTL_SECS",
                defaults.publish_list_ttl_secs,
            ),
            video_ttl_secs: parse_env_with_default("VIDEO_HASH_TTL_SECS", defaults.video_ttl_secs),
            global_feed_max_len: parse_env_optional::<usize>("GLOBAL_FEED_MAX_LEN")
                .filter(|n| *n > 0),
            strict_created_at: parse_env_flag("STRICT_CREATED_AT", defaults.strict_created_at),
        }
    }
}

fn default_health_interval_secs() -> u64 {
    60
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let app = AppConfig {
            env: std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        };

        let redis = RedisConfig {
            url: std::env::var("REDIS_URL").context("REDIS_URL environment variable not set")?,
            health_interval_secs: parse_env_with_default(
                "REDIS_HEALTH_INTERVAL_SECS",
                default_health_interval_secs(),
            ),
        };

        Ok(Config {
            app,
            redis,
            feed: FeedSettings::from_env(),
        })
    }
}
