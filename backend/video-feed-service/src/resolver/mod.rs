//! Author lookup
//!
//! The resolver answers batches of creator ids with no ordering promise, so
//! [`authors_for`] reconciles its answer by id and lines it up with the video
//! list it was built from.

use crate::error::{ServiceError, ServiceResult};
use crate::models::{AuthorRecord, UserId, VideoRecord};
use async_trait::async_trait;
use sqlx::PgPool;
use std::collections::{HashMap, HashSet};
use tracing::debug;

#[async_trait]
pub trait AuthorResolver: Send + Sync {
    async fn resolve_batch(&self, creator_ids: &[UserId]) -> ServiceResult<Vec<AuthorRecord>>;
}

/// Reads authors from the `users` table
#[derive(Clone)]
pub struct PgAuthorResolver {
    pool: PgPool,
}

impl PgAuthorResolver {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuthorResolver for PgAuthorResolver {
    async fn resolve_batch(&self, creator_ids: &[UserId]) -> ServiceResult<Vec<AuthorRecord>> {
        if creator_ids.is_empty() {
            return Ok(Vec::new());
        }

        let authors = sqlx::query_as::<_, AuthorRecord>(
            r#"
            SELECT user_id, name
            FROM users
            WHERE user_id = ANY($1)
            "#,
        )
        .bind(creator_ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(authors)
    }
}

/// One author per video, in video order, from a single resolver call.
pub async fn authors_for(
    resolver: &dyn AuthorResolver,
    videos: &[VideoRecord],
) -> ServiceResult<Vec<AuthorRecord>> {
    if videos.is_empty() {
        return Ok(Vec::new());
    }

    let mut seen = HashSet::new();
    let unique: Vec<UserId> = videos
        .iter()
        .map(|v| v.creator_id)
        .filter(|id| seen.insert(*id))
        .collect();

    let resolved = resolver.resolve_batch(&unique).await?;
    debug!(
        requested = unique.len(),
        resolved = resolved.len(),
        "Resolved authors"
    );

    let by_id: HashMap<UserId, AuthorRecord> = resolved
        .into_iter()
        .map(|author| (author.user_id, author))
        .collect();

    videos
        .iter()
        .map(|video| {
            by_id.get(&video.creator_id).cloned().ok_or_else(|| {
                ServiceError::NotFound(format!(
                    "author {} of video {}",
                    video.creator_id, video.video_id
                ))
            })
        })
        .collect()
}
