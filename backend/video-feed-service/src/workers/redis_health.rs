//! Redis keep-alive job
//!
//! Pings the cache tier on a fixed interval so idle `ConnectionManager`
//! connections are exercised, and a dead link is reported before a feed
//! request trips over it.

use feed_cache::FeedCacheOps;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

const HEALTH_CHECK_INTERVAL: Duration = Duration::from_secs(60);
const MAX_CONSECUTIVE_FAILURES: u32 = 5;

#[derive(Clone, Debug)]
pub struct RedisHealthConfig {
    pub enabled: bool,
    pub check_interval: Duration,
    pub initial_delay: Duration,
}

impl Default for RedisHealthConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            check_interval: HEALTH_CHECK_INTERVAL,
            initial_delay: Duration::from_secs(10),
        }
    }
}

impl RedisHealthConfig {
    pub fn with_interval_secs(secs: u64) -> Self {
        Self {
            enabled: secs > 0,
            check_interval: Duration::from_secs(secs.max(1)),
            ..Self::default()
        }
    }
}

/// One PING; returns the updated consecutive failure count.
pub async fn check_once(cache: &dyn FeedCacheOps, consecutive_failures: u32) -> u32 {
    match cache.ping().await {
        Ok(()) => {
            if consecutive_failures > 0 {
                tracing::info!(
                    previous_failures = consecutive_failures,
                    "Redis connection recovered"
                );
            }
            tracing::debug!("Redis health check: OK");
            0
        }
        Err(e) => {
            let failures = consecutive_failures.saturating_add(1);
            if failures >= MAX_CONSECUTIVE_FAILURES {
                tracing::error!(
                    consecutive_failures = failures,
                    error = %e,
                    "Redis health check: repeated failures"
                );
            } else {
                tracing::warn!(
                    consecutive_failures = failures,
                    error = %e,
                    "Redis health check failed"
                );
            }
            failures
        }
    }
}

/// Run the keep-alive loop until the task is dropped.
pub async fn start_redis_health_check(cache: Arc<dyn FeedCacheOps>, config: RedisHealthConfig) {
    if !config.enabled {
        tracing::info!("Redis health check disabled by configuration");
        return;
    }

    tracing::info!(
        interval_secs = config.check_interval.as_secs(),
        "Starting Redis health check for video-feed-service"
    );

    sleep(config.initial_delay).await;

    let mut consecutive_failures = 0;
    loop {
        consecutive_failures = check_once(cache.as_ref(), consecutive_failures).await;
        sleep(config.check_interval).await;
    }
}
