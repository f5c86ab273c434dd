//! Redis cache backend.

use std::time::Duration;

use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use tracing::info;

use super::backend::{BackendError, CacheBackend};

#[derive(Clone)]
pub struct RedisBackend {
    manager: ConnectionManager,
}

impl RedisBackend {
    /// Open a managed connection, failing if Redis does not answer within `connect_timeout`.
    pub async fn connect(url: &str, connect_timeout: Duration) -> Result<Self, BackendError> {
        let client = redis::Client::open(url).map_err(BackendError::backend)?;
        let manager = tokio::time::timeout(connect_timeout, ConnectionManager::new(client))
            .await
            .map_err(|_| BackendError::Timeout {
                op: "connect",
                timeout: connect_timeout,
            })?
            .map_err(BackendError::backend)?;

        let backend = Self { manager };
        backend.ping().await?;
        info!(target = "chaptrack::cache::redis", "Connected to Redis");
        Ok(backend)
    }
}

#[async_trait]
impl CacheBackend for RedisBackend {
    fn name(&self) -> &'static str {
        "redis"
    }

    async fn get(&self, key: &str) -> Result<Option<String>, BackendError> {
        let mut conn = self.manager.clone();
        conn.get(key).await.map_err(BackendError::backend)
    }

    async fn set_ex(&self, key: &str, value: String, ttl: Duration) -> Result<(), BackendError> {
        let mut conn = self.manager.clone();
        let seconds = ttl.as_secs().max(1);
        conn.set_ex::<_, _, ()>(key, value, seconds)
            .await
            .map_err(BackendError::backend)
    }

    async fn delete(&self, keys: &[String]) -> Result<u64, BackendError> {
        if keys.is_empty() {
            return Ok(0);
        }
        let mut conn = self.manager.clone();
        conn.del(keys.to_vec()).await.map_err(BackendError::backend)
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>, BackendError> {
        let mut conn = self.manager.clone();
        conn.keys(pattern).await.map_err(BackendError::backend)
    }

    async fn ping(&self) -> Result<(), BackendError> {
        let mut conn = self.manager.clone();
        let _pong: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(BackendError::backend)?;
        Ok(())
    }
}
