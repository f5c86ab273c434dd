//! Metric names emitted by the cache service.
//!
//! Every cache counter carries a `namespace` label holding one of
//! [`NAMESPACES`].

use metrics::counter;

use super::keys::{ANALYTICS_NAMESPACE, ENTITY_NAMESPACE, FILTERS_NAMESPACE, LIST_NAMESPACE};

pub const HIT_TOTAL: &str = "chaptrack_cache_hit_total";
pub const MISS_TOTAL: &str = "chaptrack_cache_miss_total";
pub const UNAVAILABLE_TOTAL: &str = "chaptrack_cache_unavailable_total";
pub const INVALIDATED_KEYS_TOTAL: &str = "chaptrack_cache_invalidated_keys_total";

pub const NAMESPACES: [&str; 4] = [
    LIST_NAMESPACE,
    ENTITY_NAMESPACE,
    ANALYTICS_NAMESPACE,
    FILTERS_NAMESPACE,
];

/// Register every `(counter, namespace)` series at zero so dashboards see
/// them before the first request.
pub fn register_series() {
    for name in [HIT_TOTAL, MISS_TOTAL, UNAVAILABLE_TOTAL, INVALIDATED_KEYS_TOTAL] {
        for namespace in NAMESPACES {
            counter!(name, "namespace" => namespace).absolute(0);
        }
    }
}
