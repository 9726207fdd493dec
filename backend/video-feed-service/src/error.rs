/// Error types for video-feed-service
use feed_cache::CacheError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    /// Durable store failures; never retried inside the service.
    pub fn is_storage(&self) -> bool {
        matches!(self, ServiceError::Database(_))
    }

    pub fn is_cache(&self) -> bool {
        matches!(self, ServiceError::Cache(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ServiceError::NotFound(_))
    }
}

/// Result type alias for service operations
pub type ServiceResult<T> = Result<T, ServiceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        let storage = ServiceError::from(sqlx::Error::PoolTimedOut);
        assert!(storage.is_storage());
        assert!(!storage.is_cache());

        let cache = ServiceError::from(CacheError::Redis(redis::RedisError::from((
            redis::ErrorKind::IoError,
            "connection reset",
        ))));
        assert!(cache.is_cache());
        assert!(cache.to_string().starts_with("Cache error"));

        let missing = ServiceError::NotFound("video 7".to_string());
        assert!(missing.is_not_found());
        assert_eq!(missing.to_string(), "Not found: video 7");
    }
}
