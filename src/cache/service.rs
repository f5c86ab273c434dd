//! Failure-tolerant facade over a [`CacheBackend`].
//!
//! Nothing in here returns an error to the caller. Backend failures and
//! timeouts are logged, counted, and then read as a miss (for lookups) or a
//! no-op (for writes and invalidation).

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::backend::{BackendError, CacheBackend, CacheLookup};
use super::config::CacheConfig;
use super::keys::namespace_of;
use super::metrics::{HIT_TOTAL, INVALIDATED_KEYS_TOTAL, MISS_TOTAL, UNAVAILABLE_TOTAL};

const SOURCE: &str = "cache::service";

/// Reachability of the cache as reported by `/health`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheHealth {
    Disabled,
    Connected,
    Unavailable,
}

impl CacheHealth {
    pub fn as_str(self) -> &'static str {
        match self {
            CacheHealth::Disabled => "disabled",
            CacheHealth::Connected => "connected",
            CacheHealth::Unavailable => "unavailable",
        }
    }
}

#[derive(Clone)]
pub struct CacheService {
    backend: Option<Arc<dyn CacheBackend>>,
    config: CacheConfig,
}

impl CacheService {
    pub fn new(backend: Arc<dyn CacheBackend>, config: CacheConfig) -> Self {
        Self {
            backend: Some(backend),
            config,
        }
    }

    /// A cache that never stores anything; every lookup is a miss.
    pub fn disabled(config: CacheConfig) -> Self {
        Self {
            backend: None,
            config,
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn is_enabled(&self) -> bool {
        self.backend.is_some()
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend
            .as_ref()
            .map_or("disabled", |backend| backend.name())
    }

    fn prefixed(&self, key: &str) -> String {
        format!("{}{}", self.config.key_prefix, key)
    }

    async fn run<T, F>(&self, op: &'static str, fut: F) -> Result<T, BackendError>
    where
        F: Future<Output = Result<T, BackendError>>,
    {
        let timeout = self.config.op_timeout;
        match tokio::time::timeout(timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(BackendError::Timeout { op, timeout }),
        }
    }

    /// Look a key up and decode it.
    pub async fn lookup<T: DeserializeOwned>(&self, key: &str) -> CacheLookup<T> {
        let Some(backend) = self.backend.as_ref() else {
            return CacheLookup::Miss;
        };
        let namespace = namespace_of(key).to_string();
        let full_key = self.prefixed(key);

        let raw = match self.run("get", backend.get(&full_key)).await {
            Ok(raw) => raw,
            Err(err) => {
                warn!(
                    target = SOURCE,
                    op = "get",
                    key = %full_key,
                    error = %err,
                    "Cache read failed; falling back to the store"
                );
                counter!(UNAVAILABLE_TOTAL, "namespace" => namespace)
                    .increment(1);
                return CacheLookup::Unavailable;
            }
        };

        let Some(raw) = raw else {
            counter!(MISS_TOTAL, "namespace" => namespace).increment(1);
            debug!(target = SOURCE, key = %full_key, "Cache miss");
            return CacheLookup::Miss;
        };

        match serde_json::from_str(&raw) {
            Ok(value) => {
                counter!(HIT_TOTAL, "namespace" => namespace).increment(1);
                debug!(target = SOURCE, key = %full_key, "Cache hit");
                CacheLookup::Hit(value)
            }
            Err(err) => {
                warn!(
                    target = SOURCE,
                    key = %full_key,
                    error = %err,
                    "Discarding undecodable cache entry"
                );
                counter!(MISS_TOTAL, "namespace" => namespace).increment(1);
                CacheLookup::Miss
            }
        }
    }

    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.lookup(key).await.into_option()
    }

    /// Store `value` under `key`; `ttl` falls back to the configured default.
    /// Returns whether the backend accepted the write.
    pub async fn set<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        ttl: Option<Duration>,
    ) -> bool {
        let Some(backend) = self.backend.as_ref() else {
            return false;
        };
        let full_key = self.prefixed(key);
        let payload = match serde_json::to_string(value) {
            Ok(payload) => payload,
            Err(err) => {
                warn!(target = SOURCE, key = %full_key, error = %err, "Failed to encode cache entry");
                return false;
            }
        };
        let ttl = ttl.unwrap_or(self.config.default_ttl);

        match self.run("set", backend.set_ex(&full_key, payload, ttl)).await {
            Ok(()) => true,
            Err(err) => {
                warn!(target = SOURCE, op = "set", key = %full_key, error = %err, "Cache write failed");
                counter!(
                    UNAVAILABLE_TOTAL,
                    "namespace" => namespace_of(key).to_string()
                )
                .increment(1);
                false
            }
        }
    }

    /// Remove one key. Missing keys are not an error.
    pub async fn delete(&self, key: &str) -> bool {
        let Some(backend) = self.backend.as_ref() else {
            return false;
        };
        let full_key = self.prefixed(key);
        match self
            .run("delete", backend.delete(std::slice::from_ref(&full_key)))
            .await
        {
            Ok(removed) => removed > 0,
            Err(err) => {
                warn!(target = SOURCE, op = "delete", key = %full_key, error = %err, "Cache delete failed");
                false
            }
        }
    }

    /// Delete every key under the prefix matching `pattern`, in one batch.
    /// Returns the number of keys removed.
    pub async fn invalidate_pattern(&self, pattern: &str) -> u64 {
        let Some(backend) = self.backend.as_ref() else {
            return 0;
        };
        let full_pattern = self.prefixed(pattern);

        let keys = match self.run("keys", backend.keys(&full_pattern)).await {
            Ok(keys) => keys,
            Err(err) => {
                warn!(
                    target = SOURCE,
                    op = "keys",
                    pattern = %full_pattern,
                    error = %err,
                    "Cache invalidation skipped"
                );
                return 0;
            }
        };
        if keys.is_empty() {
            return 0;
        }

        match self.run("delete", backend.delete(&keys)).await {
            Ok(removed) => {
                counter!(
                    INVALIDATED_KEYS_TOTAL,
                    "namespace" => namespace_of(pattern).to_string()
                )
                .increment(removed);
                debug!(target = SOURCE, pattern = %full_pattern, removed, "Cache keys invalidated");
                removed
            }
            Err(err) => {
                warn!(
                    target = SOURCE,
                    op = "delete",
                    pattern = %full_pattern,
                    error = %err,
                    "Cache invalidation failed"
                );
                0
            }
        }
    }

    pub async fn health(&self) -> CacheHealth {
        let Some(backend) = self.backend.as_ref() else {
            return CacheHealth::Disabled;
        };
        match self.run("ping", backend.ping()).await {
            Ok(()) => CacheHealth::Connected,
            Err(err) => {
                warn!(target = SOURCE, op = "ping", error = %err, "Cache health check failed");
                CacheHealth::Unavailable
            }
        }
    }
}
