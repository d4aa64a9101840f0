use opentelemetry::{KeyValue, global, trace::TracerProvider};
use opentelemetry_appender_tracing::layer::OpenTelemetryTracingBridge;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{
    Resource,
    logs::LoggerProvider as SdkLoggerProvider,
    propagation::TraceContextPropagator,
    runtime,
    trace::{RandomIdGenerator, Sampler, TracerProvider as SdkTracerProvider},
};
use tracing_subscriber::{Registry, layer::SubscriberExt, util::SubscriberInitExt};

/// Providers that buffer telemetry and must be flushed before exit.
#[must_use]
pub struct TelemetryGuard {
    logger_provider: Option<SdkLoggerProvider>,
}

impl TelemetryGuard {
    /// Flushes pending OTLP logs, then the global tracer provider.
    pub fn shutdown(self) -> Result<(), anyhow::Error> {
        if let Some(provider) = self.logger_provider {
            provider.shutdown()?;
        }
        global::shutdown_tracer_provider();
        Ok(())
    }
}

/// Installs the global subscriber: console output always, OTLP traces and
/// logs only when an endpoint is configured.
pub fn init_tracing(otlp_endpoint: Option<&str>) -> Result<TelemetryGuard, anyhow::Error> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "records_server=info,record_store=info,axum=info".into());

    let fmt_layer = tracing_subscriber::fmt::layer().with_target(true);

    let Some(otlp_endpoint) = otlp_endpoint else {
        Registry::default().with(env_filter).with(fmt_layer).init();
        return Ok(TelemetryGuard {
            logger_provider: None,
        });
    };

    let service_name =
        std::env::var("OTEL_SERVICE_NAME").unwrap_or_else(|_| "records-server".to_string());

    global::set_text_map_propagator(TraceContextPropagator::new());

    let resource = Resource::new(vec![KeyValue::new("service.name", service_name.clone())]);

    let trace_exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(otlp_endpoint)
        .build()?;

    let tracer_provider = SdkTracerProvider::builder()
        .with_batch_exporter(trace_exporter, runtime::Tokio)
        .with_sampler(Sampler::AlwaysOn)
        .with_id_generator(RandomIdGenerator::default())
        .with_resource(resource.clone())
        .build();

    // Tracer must be taken before the provider moves into the global slot.
    let tracer = tracer_provider.tracer(service_name);
    global::set_tracer_provider(tracer_provider);

    let telemetry_layer = tracing_opentelemetry::layer().with_tracer(tracer);

    let log_exporter = opentelemetry_otlp::LogExporter::builder()
        .with_tonic()
        .with_endpoint(otlp_endpoint)
        .build()?;

    let logger_provider = SdkLoggerProvider::builder()
        .with_batch_exporter(log_exporter, runtime::Tokio)
        .with_resource(resource)
        .build();

    let log_layer = OpenTelemetryTracingBridge::new(&logger_provider);

    Registry::default()
        .with(env_filter)
        .with(fmt_layer)
        .with(telemetry_layer)
        .with(log_layer)
        .init();

    Ok(TelemetryGuard {
        logger_provider: Some(logger_provider),
    })
}
