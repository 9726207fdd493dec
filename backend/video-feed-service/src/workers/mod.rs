//! Background jobs started by the binary

pub mod redis_health;

pub use redis_health::{start_redis_health_check, RedisHealthConfig};
