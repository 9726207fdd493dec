use crate::error::{ServiceError, ServiceResult};
use crate::models::{UserId, VideoId, VideoRecord};
use async_trait::async_trait;
use sqlx::PgPool;

/// Durable source of truth for video records
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn insert(&self, video: &VideoRecord) -> ServiceResult<()>;

    /// Exactly one row; zero rows is `ServiceError::NotFound`
    async fn find_by_id(&self, video_id: VideoId) -> ServiceResult<VideoRecord>;

    async fn find_by_creator(&self, creator_id: UserId) -> ServiceResult<Vec<VideoRecord>>;

    /// Every stored video, used to seed the global feed
    async fn find_all(&self) -> ServiceResult<Vec<VideoRecord>>;
}

/// Repository for the `videos` table
#[derive(Clone)]
pub struct PgVideoRepository {
    pool: PgPool,
}

impl PgVideoRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RecordStore for PgVideoRepository {
    async fn insert(&self, video: &VideoRecord) -> ServiceResult<()> {
        sqlx::query(
            r#"
            INSERT INTO videos (video_id, title, media_name, cover_name, creator_id, created_at, ext_info)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(video.video_id)
        .bind(&video.title)
        .bind(&video.media_name)
        .bind(&video.cover_name)
        .bind(video.creator_id)
        .bind(video.created_at)
        .bind(&video.ext_info)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_by_id(&self, video_id: VideoId) -> ServiceResult<VideoRecord> {
        sqlx::query_as::<_, VideoRecord>(
            r#"
            SELECT video_id, title, media_name, cover_name, creator_id, created_at, ext_info
            FROM videos
            WHERE video_id = $1
            LIMIT 1
            "#,
        )
        .bind(video_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("video {}", video_id)))
    }

    async fn find_by_creator(&self, creator_id: UserId) -> ServiceResult<Vec<VideoRecord>> {
        let videos = sqlx::query_as::<_, VideoRecord>(
            r#"
            SELECT video_id, title, media_name, cover_name, creator_id, created_at, ext_info
            FROM videos
            WHERE creator_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(creator_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(videos)
    }

    async fn find_all(&self) -> ServiceResult<Vec<VideoRecord>> {
        let videos = sqlx::query_as::<_, VideoRecord>(
            r#"
            SELECT video_id, title, media_name, cover_name, creator_id, created_at, ext_info
            FROM videos
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(videos)
    }
}
