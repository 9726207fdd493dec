use anyhow::{Context, Result};
use db_pool::{create_pool, DbConfig};
use feed_cache::{CacheMetrics, FeedCacheOps, RedisFeedCache};
use redis_utils::RedisPool;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use video_feed_service::repository::PgVideoRepository;
use video_feed_service::resolver::PgAuthorResolver;
use video_feed_service::workers::{start_redis_health_check, RedisHealthConfig};
use video_feed_service::{Config, VideoFeedService};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,video_feed_service=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(true)
                .with_line_number(true)
                .with_target(true),
        )
        .init();

    let config = Config::from_env().context("Failed to load configuration")?;
    info!(env = %config.app.env, "Starting video-feed-service");

    let db_config = DbConfig::from_env("video-feed-service")
        .map_err(anyhow::Error::msg)
        .context("Failed to load database configuration")?;
    db_config.log_config();
    let db_pool = create_pool(db_config)
        .await
        .context("Failed to create database pool")?;

    let redis = RedisPool::connect(&config.redis.url)
        .await
        .context("Failed to connect to Redis")?;
    info!(addr = %redis.addr_label(), "Redis connection established");

    let metrics = CacheMetrics::new();
    if let Err(e) = CacheMetrics::register(prometheus::default_registry()) {
        warn!(error = %e, "Cache metrics already registered");
    }

    let cache: Arc<dyn FeedCacheOps> =
        Arc::new(RedisFeedCache::with_metrics(redis.manager(), metrics));
    let service = VideoFeedService::new(
        cache.clone(),
        Arc::new(PgVideoRepository::new(db_pool.clone())),
        Arc::new(PgAuthorResolver::new(db_pool)),
        config.feed.clone(),
    );

    match service.ensure_global_feed().await {
        Ok(true) => info!("Global feed seeded from store"),
        Ok(false) => info!("Global feed already populated"),
        Err(e) => error!(error = %e, "Global feed warm-up failed, will retry on publish"),
    }

    let health = tokio::spawn(start_redis_health_check(
        cache,
        RedisHealthConfig::with_interval_secs(config.redis.health_interval_secs),
    ));

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    info!("Shutdown signal received");
    health.abort();

    Ok(())
}
