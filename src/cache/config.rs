//! Cache policy.
//!
//! Backend selection lives in `config::CacheSettings`; this is the part the
//! cache service itself consults on every call.

use std::time::Duration;

use super::keys::DEFAULT_KEY_PREFIX;

const DEFAULT_TTL_SECS: u64 = 3600;
const DEFAULT_ANALYTICS_TTL_SECS: u64 = 1800;
const DEFAULT_OP_TIMEOUT_MS: u64 = 250;

#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Prepended to every key written by this process.
    pub key_prefix: String,
    /// TTL applied when a caller does not pass one.
    pub default_ttl: Duration,
    pub analytics_ttl: Duration,
    /// Upper bound for a single backend round trip.
    pub op_timeout: Duration,
    /// Also drop `analytics:*` and `filters:*` after each successful write.
    pub invalidate_aggregates_on_write: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            default_ttl: Duration::from_secs(DEFAULT_TTL_SECS),
            analytics_ttl: Duration::from_secs(DEFAULT_ANALYTICS_TTL_SECS),
            op_timeout: Duration::from_millis(DEFAULT_OP_TIMEOUT_MS),
            invalidate_aggregates_on_write: false,
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            key_prefix: settings.key_prefix.clone(),
            default_ttl: Duration::from_secs(settings.default_ttl_secs.get()),
            analytics_ttl: Duration::from_secs(settings.analytics_ttl_secs.get()),
            op_timeout: Duration::from_millis(settings.op_timeout_ms.get()),
            invalidate_aggregates_on_write: settings.invalidate_aggregates_on_write,
        }
    }
}
