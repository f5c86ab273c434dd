//! In-process cache backend.
//!
//! Entries live in a bounded LRU map. Expired entries are dropped when read
//! and swept whenever keys are enumerated.

use std::num::NonZeroUsize;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use glob::Pattern;
use lru::LruCache;
use tracing::warn;

use super::backend::{BackendError, CacheBackend};

const SOURCE: &str = "cache::memory";

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Instant,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at > now
    }
}

pub struct MemoryBackend {
    entries: RwLock<LruCache<String, Entry>>,
}

impl MemoryBackend {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            entries: RwLock::new(LruCache::new(capacity)),
        }
    }

    /// Number of stored entries, including ones that expired but were not yet swept.
    pub fn len(&self) -> usize {
        self.read("len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // The map stays consistent across a panic; poisoning is recovered.
    fn read(&self, op: &'static str) -> RwLockReadGuard<'_, LruCache<String, Entry>> {
        self.entries.read().unwrap_or_else(|poisoned| {
            warn!(target = SOURCE, op, "Recovered poisoned memory cache lock");
            PoisonError::into_inner(poisoned)
        })
    }

    fn write(&self, op: &'static str) -> RwLockWriteGuard<'_, LruCache<String, Entry>> {
        self.entries.write().unwrap_or_else(|poisoned| {
            warn!(target = SOURCE, op, "Recovered poisoned memory cache lock");
            PoisonError::into_inner(poisoned)
        })
    }
}

#[async_trait]
impl CacheBackend for MemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, key: &str) -> Result<Option<String>, BackendError> {
        let now = Instant::now();
        let mut entries = self.write("get");
        let found = entries
            .get(key)
            .map(|entry| entry.is_live(now).then(|| entry.value.clone()));
        match found {
            Some(Some(value)) => Ok(Some(value)),
            Some(None) => {
                entries.pop(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set_ex(&self, key: &str, value: String, ttl: Duration) -> Result<(), BackendError> {
        let expires_at = Instant::now() + ttl;
        self.write("set_ex").put(key.to_string(), Entry { value, expires_at });
        Ok(())
    }

    async fn delete(&self, keys: &[String]) -> Result<u64, BackendError> {
        let mut entries = self.write("delete");
        let removed = keys
            .iter()
            .filter(|key| entries.pop(key.as_str()).is_some())
            .count();
        Ok(removed as u64)
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>, BackendError> {
        let pattern = Pattern::new(pattern).map_err(BackendError::backend)?;
        let now = Instant::now();
        let mut entries = self.write("keys");

        let expired: Vec<String> = entries
            .iter()
            .filter(|(_, entry)| !entry.is_live(now))
            .map(|(key, _)| key.clone())
            .collect();
        for key in &expired {
            entries.pop(key);
        }

        Ok(entries
            .iter()
            .filter(|(key, _)| pattern.matches(key))
            .map(|(key, _)| key.clone())
            .collect())
    }

    async fn ping(&self) -> Result<(), BackendError> {
        Ok(())
    }
}
