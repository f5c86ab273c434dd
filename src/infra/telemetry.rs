use std::sync::Once;

use metrics::{Unit, describe_counter};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::cache::metrics as cache_metrics;
use crate::config::{LogFormat, LoggingSettings};
use crate::infra::http::api::rate_limit::RATE_LIMITED_TOTAL;

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install a global tracing subscriber using the provided logging settings.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(true).boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .map_err(|err| {
            InfraError::telemetry(format!("failed to install tracing subscriber: {err}"))
        })
}

/// Describe every counter and register the per-namespace cache series.
pub fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        let described = [
            (
                cache_metrics::HIT_TOTAL,
                "Cache lookups answered from the cache, by namespace.",
            ),
            (
                cache_metrics::MISS_TOTAL,
                "Cache lookups that fell through to the store, by namespace.",
            ),
            (
                cache_metrics::UNAVAILABLE_TOTAL,
                "Cache operations that failed or timed out, by namespace.",
            ),
            (
                cache_metrics::INVALIDATED_KEYS_TOTAL,
                "Cache keys removed by write invalidation, by namespace.",
            ),
            (
                RATE_LIMITED_TOTAL,
                "Requests rejected by the per-client rate limiter.",
            ),
        ];
        for (name, help) in described {
            describe_counter!(name, Unit::Count, help);
        }
        cache_metrics::register_series();
    });
}
