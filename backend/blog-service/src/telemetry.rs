//! Log and trace subscriber setup
//!
//! Every binary installs one `tracing` subscriber: an env filter, a JSON or
//! pretty formatter, and an OpenTelemetry layer when OTLP export is enabled.
//! Spans are exported in batches over gRPC to the configured collector.

use anyhow::{Context, Result};
use opentelemetry::{global, KeyValue};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{
    propagation::TraceContextPropagator,
    runtime,
    trace::{RandomIdGenerator, Sampler, Tracer},
    Resource,
};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{LogFormat, TracingConfig};

/// Install the global subscriber.
///
/// `default_filter` applies when `RUST_LOG` is unset. Call [`shutdown_tracing`]
/// before exit so buffered spans reach the collector.
pub fn init_tracing(
    service_name: &str,
    default_filter: &str,
    format: LogFormat,
    config: &TracingConfig,
) -> Result<()> {
    let tracer = init_tracer(service_name, config)?;
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let (json_layer, pretty_layer) = match format {
        LogFormat::Json => (Some(fmt::layer().with_target(false).json()), None),
        LogFormat::Pretty => (None, Some(fmt::layer().with_target(false))),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(pretty_layer)
        .with(tracer.map(|tracer| tracing_opentelemetry::layer().with_tracer(tracer)))
        .try_init()
        .context("Failed to install tracing subscriber")?;

    match &config.otlp_endpoint {
        Some(endpoint) => tracing::info!(
            service = service_name,
            endpoint = %endpoint,
            sample_rate = config.sample_rate,
            "OpenTelemetry tracing initialized"
        ),
        None => tracing::debug!(service = service_name, "OTLP export disabled"),
    }

    Ok(())
}

/// Build the OTLP tracer, or `None` when export is disabled.
///
/// Also installs the W3C trace-context propagator so incoming `traceparent`
/// headers continue the caller's trace.
pub fn init_tracer(service_name: &str, config: &TracingConfig) -> Result<Option<Tracer>> {
    let Some(endpoint) = config.otlp_endpoint.clone() else {
        return Ok(None);
    };

    global::set_text_map_propagator(TraceContextPropagator::new());

    let resource = Resource::new(vec![
        KeyValue::new("service.name", service_name.to_string()),
        KeyValue::new("service.version", config.service_version.clone()),
        KeyValue::new("deployment.environment", config.environment.clone()),
    ]);

    let exporter = opentelemetry_otlp::new_exporter()
        .tonic()
        .with_endpoint(endpoint);

    let tracer = opentelemetry_otlp::new_pipeline()
        .tracing()
        .with_exporter(exporter)
        .with_trace_config(
            opentelemetry_sdk::trace::config()
                .with_sampler(Sampler::TraceIdRatioBased(config.sample_rate))
                .with_id_generator(RandomIdGenerator::default())
                .with_resource(resource),
        )
        .install_batch(runtime::Tokio)
        .context("Failed to install OTLP tracer")?;

    Ok(Some(tracer))
}

/// Flush pending spans and shut the tracer provider down.
pub fn shutdown_tracing() {
    global::shutdown_tracer_provider();
}
