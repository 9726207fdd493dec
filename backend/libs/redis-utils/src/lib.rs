use anyhow::{Context, Result};
use redis::aio::ConnectionManager;
use redis::{Client, ConnectionAddr, ConnectionInfo, IntoConnectionInfo};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::{timeout, Duration};
use tracing::info;

/// Shared Redis connection manager guarded by a Tokio mutex.
pub type SharedConnectionManager = Arc<Mutex<ConnectionManager>>;

/// How long startup waits for the first Redis connection.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Redis connection pool shared by the cache tier.
///
/// `ConnectionManager` reconnects on its own after a dropped connection, so a
/// single manager per process is enough for request handlers.
pub struct RedisPool {
    manager: SharedConnectionManager,
    addr_label: String,
}

impl RedisPool {
    pub async fn connect(redis_url: &str) -> Result<Self> {
        Self::connect_with_timeout(redis_url, DEFAULT_CONNECT_TIMEOUT).await
    }

    pub async fn connect_with_timeout(redis_url: &str, connect_timeout: Duration) -> Result<Self> {
        let info: ConnectionInfo = redis_url
            .into_connection_info()
            .context("failed to parse REDIS_URL connection string")?;
        let addr_label = describe_addr(&info.addr);

        let client = Client::open(info).context("failed to construct Redis client")?;
        let connection_manager = timeout(connect_timeout, ConnectionManager::new(client))
            .await
            .with_context(|| {
                format!(
                    "timed out after {}s connecting to Redis at {}",
                    connect_timeout.as_secs(),
                    addr_label
                )
            })?
            .context("failed to initialize Redis connection manager")?;

        info!(addr = %addr_label, "Redis connection manager ready");

        Ok(Self {
            manager: Arc::new(Mutex::new(connection_manager)),
            addr_label,
        })
    }

    pub fn manager(&self) -> SharedConnectionManager {
        self.manager.clone()
    }

    pub fn addr_label(&self) -> &str {
        &self.addr_label
    }
}

/// Host/port label for logs; never includes credentials.
fn describe_addr(addr: &ConnectionAddr) -> String {
    match addr {
        ConnectionAddr::Tcp(host, port) => format!("{}:{}", host, port),
        ConnectionAddr::TcpTls { host, port, .. } => format!("rediss://{}:{}", host, port),
        ConnectionAddr::Unix(path) => format!("unix:{}", path.display()),
        #[allow(unreachable_patterns)]
        _ => "redis".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_tcp_addr() {
        let info = "redis://:secret@cache.internal:6380/0"
            .into_connection_info()
            .unwrap();
        let label = describe_addr(&info.addr);
        assert_eq!(label, "cache.internal:6380");
        assert!(!label.contains("secret"));
    }

    #[test]
    fn test_describe_tls_addr() {
        let info = "rediss://cache.internal:6379".into_connection_info().unwrap();
        assert_eq!(describe_addr(&info.addr), "rediss://cache.internal:6379");
    }

    #[tokio::test]
    async fn test_connect_rejects_malformed_url() {
        let result = RedisPool::connect("not a redis url").await;
        assert!(result.is_err());
    }
}
