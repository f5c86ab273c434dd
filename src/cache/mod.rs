//! Chapter read cache.
//!
//! Read paths go through [`CacheService`], which namespaces keys, applies
//! TTLs and hides backend failures. Two backends are available: Redis for
//! shared deployments and an in-process LRU map. With `cache.backend =
//! "disabled"` the service runs without one and every lookup misses.
//!
//! ```toml
//! [cache]
//! backend = "redis"
//! redis_url = "redis://127.0.0.1:6379"
//! default_ttl_secs = 3600
//! analytics_ttl_secs = 1800
//! ```

mod backend;
mod config;
mod keys;
mod memory;
pub mod metrics;
mod redis_backend;
mod service;

pub use backend::{BackendError, CacheBackend, CacheLookup};
pub use config::CacheConfig;
pub use keys::{
    ANALYTICS_NAMESPACE, ANALYTICS_OVERVIEW_KEY, CacheKey, DEFAULT_KEY_PREFIX, ENTITY_NAMESPACE,
    FILTER_OPTIONS_KEY, FILTERS_NAMESPACE, LIST_NAMESPACE, entity_key, list_key,
    namespace_pattern,
};
pub use memory::MemoryBackend;
pub use redis_backend::RedisBackend;
pub use service::{CacheHealth, CacheService};
