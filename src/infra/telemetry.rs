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

pub fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            "lpi_render_requests_total",
            Unit::Count,
            "Total number of PDF render requests handled, labelled by result."
        );
        describe_histogram!(
            "lpi_render_duration_ms",
            Unit::Milliseconds,
            "Headless render latency in milliseconds."
        );
        describe_counter!(
            "lpi_render_canvas_polls_total",
            Unit::Count,
            "Canvas readiness checks performed, labelled by whether the page became ready."
        );
        describe_counter!(
            "lpi_export_endpoint_attempts_total",
            Unit::Count,
            "Render endpoint attempts made by the exporter, labelled by result."
        );
        describe_counter!(
            "lpi_export_outcomes_total",
            Unit::Count,
            "Completed export runs, labelled by terminal state."
        );
    });
}
