//! Video feed service
//!
//! Chronological global feed and per-creator publish lists, served from a
//! Redis sorted-set cache that is kept consistent with the Postgres video
//! store.

pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod resolver;
pub mod services;
pub mod workers;

pub use config::{Config, FeedSettings};
pub use error::{ServiceError, ServiceResult};
pub use models::{AuthorRecord, FeedPage, PublishRequest, UserId, VideoId, VideoRecord};
pub use services::VideoFeedService;
