//! Backend abstraction shared by the Redis and in-process caches.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("cache backend error: {0}")]
    Backend(String),
    #[error("cache operation `{op}` timed out after {timeout:?}")]
    Timeout { op: &'static str, timeout: Duration },
}

impl BackendError {
    pub fn backend(err: impl std::fmt::Display) -> Self {
        Self::Backend(err.to_string())
    }
}

/// Raw key-value store with per-key expiry and glob enumeration.
///
/// Keys passed to a backend are already namespaced; backends never add or
/// strip prefixes.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Short label used in logs and health output.
    fn name(&self) -> &'static str;

    async fn get(&self, key: &str) -> Result<Option<String>, BackendError>;

    async fn set_ex(&self, key: &str, value: String, ttl: Duration) -> Result<(), BackendError>;

    /// Delete the given keys, returning how many existed.
    async fn delete(&self, keys: &[String]) -> Result<u64, BackendError>;

    /// Keys matching a Redis-style glob (`*`, `?`, `[...]`).
    async fn keys(&self, pattern: &str) -> Result<Vec<String>, BackendError>;

    async fn ping(&self) -> Result<(), BackendError>;
}

/// Outcome of a cache read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheLookup<T> {
    Hit(T),
    Miss,
    /// The backend could not answer; callers treat this like a miss.
    Unavailable,
}

impl<T> CacheLookup<T> {
    pub fn is_hit(&self) -> bool {
        matches!(self, CacheLookup::Hit(_))
    }

    pub fn into_option(self) -> Option<T> {
        match self {
            CacheLookup::Hit(value) => Some(value),
            CacheLookup::Miss | CacheLookup::Unavailable => None,
        }
    }
}
