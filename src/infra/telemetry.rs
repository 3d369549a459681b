use std::sync::Once;

use metrics::{Unit, describe_counter, describe_histogram};
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
            .with_writer(std::io::stderr)
            .boxed(),
        LogFormat::Compact => fmt::layer()
            .compact()
            .with_target(true)
            .with_writer(std::io::stderr)
            .boxed(),
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
            "pressroom_feed_refresh_total",
            Unit::Count,
            "Total number of published list replacements."
        );
        describe_counter!(
            "pressroom_feed_refresh_failed_total",
            Unit::Count,
            "Total number of published list re-reads that failed."
        );
        describe_counter!(
            "pressroom_feed_refresh_discarded_total",
            Unit::Count,
            "Total number of published list reads dropped because their view was released."
        );
        describe_counter!(
            "pressroom_operator_list_refresh_failed_total",
            Unit::Count,
            "Total number of operator list re-reads that failed."
        );
        describe_counter!(
            "pressroom_changefeed_coalesced_total",
            Unit::Count,
            "Total number of change signals folded into an already scheduled re-read."
        );
        describe_counter!(
            "pressroom_changefeed_subscribe_failed_total",
            Unit::Count,
            "Total number of change feed subscriptions that could not be established."
        );
        describe_histogram!(
            "pressroom_asset_upload_ms",
            Unit::Milliseconds,
            "Asset upload latency in milliseconds."
        );
    });
}
