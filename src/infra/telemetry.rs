use std::sync::Once;

use metrics::{Unit, describe_counter};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::config::{LogFormat, LoggingSettings};

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

/// Register descriptions for every counter the crate emits. Safe to call more
/// than once.
pub fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            "scriptorium_cache_hit_total",
            Unit::Count,
            "Cache lookups answered from the cache, labelled by kind (list|post)."
        );
        describe_counter!(
            "scriptorium_cache_miss_total",
            Unit::Count,
            "Cache lookups that fell through to the store, labelled by kind (list|post)."
        );
        describe_counter!(
            "scriptorium_cache_invalidate_total",
            Unit::Count,
            "Cache invalidations issued after writes, labelled by kind (list|post)."
        );
        describe_counter!(
            "scriptorium_cache_evict_total",
            Unit::Count,
            "In-memory cache entries evicted due to capacity."
        );
        describe_counter!(
            "scriptorium_side_effect_failure_total",
            Unit::Count,
            "Non-fatal cache or image failures, labelled by kind."
        );
    });
}
