use std::sync::Once;

use metrics::{Unit, describe_counter, describe_gauge};
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

fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            "properties_cache_backend_hit_total",
            Unit::Count,
            "Total number of in-process backend lookups that found a live key."
        );
        describe_counter!(
            "properties_cache_backend_miss_total",
            Unit::Count,
            "Total number of in-process backend lookups that found nothing."
        );
        describe_counter!(
            "properties_cache_backend_evict_total",
            Unit::Count,
            "Total number of in-process backend evictions due to capacity."
        );
        describe_counter!(
            "properties_cache_backend_expired_total",
            Unit::Count,
            "Total number of in-process backend keys purged after their TTL."
        );
        describe_counter!(
            "properties_cache_aggregate_hit_total",
            Unit::Count,
            "Total number of listing reads served from the aggregate entry."
        );
        describe_counter!(
            "properties_cache_aggregate_miss_total",
            Unit::Count,
            "Total number of listing reads that fell through to the store."
        );
        describe_counter!(
            "properties_cache_invalidation_total",
            Unit::Count,
            "Total number of aggregate entry deletions triggered by store writes."
        );
        describe_counter!(
            "properties_cache_response_hit_total",
            Unit::Count,
            "Total number of listing responses served from the response cache."
        );
        describe_counter!(
            "properties_cache_response_miss_total",
            Unit::Count,
            "Total number of listing responses rendered by the handler."
        );
        describe_gauge!(
            "properties_cache_hit_ratio",
            Unit::Percent,
            "Backend-wide hit ratio observed at the last metrics report."
        );
    });
}
