use opentelemetry::{KeyValue, metrics::MeterProvider};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{
    Resource,
    metrics::{MeterProviderBuilder, PeriodicReader, SdkMeterProvider},
};
use std::time::Duration;

pub struct Metrics {
    pub request_counter: opentelemetry::metrics::Counter<u64>,
    pub request_duration: opentelemetry::metrics::Histogram<f64>,
    pub records_stored: opentelemetry::metrics::UpDownCounter<i64>,
    pub auth_failures: opentelemetry::metrics::Counter<u64>,
}

impl Metrics {
    pub fn new(provider: &SdkMeterProvider) -> Self {
        let meter = provider.meter("records-server");

        Self {
            request_counter: meter
                .u64_counter("records_requests_total")
                .with_description("Total number of handled requests by method and status")
                .build(),
            request_duration: meter
                .f64_histogram("records_request_duration_milliseconds")
                .with_description("Request handling duration")
                .build(),
            records_stored: meter
                .i64_up_down_counter("records_stored")
                .with_description("Number of records currently held in memory")
                .build(),
            auth_failures: meter
                .u64_counter("records_auth_failures_total")
                .with_description("Requests rejected for missing or invalid credentials")
                .build(),
        }
    }

    pub fn record_request(&self, method: &str, status: u16, elapsed: Duration) {
        let attrs = [
            KeyValue::new("method", method.to_string()),
            KeyValue::new("status", i64::from(status)),
        ];
        self.request_counter.add(1, &attrs);
        self.request_duration
            .record(elapsed.as_secs_f64() * 1000.0, &attrs);
    }

    pub fn inc_auth_failure(&self) {
        self.auth_failures.add(1, &[]);
    }

    pub fn records_added(&self, count: usize) {
        self.records_stored.add(count as i64, &[]);
    }

    pub fn record_removed(&self) {
        self.records_stored.add(-1, &[]);
    }
}

/// Metrics that are recorded but never exported. Used when no OTLP
/// endpoint is configured, and in tests.
pub fn local_metrics() -> (SdkMeterProvider, Metrics) {
    let provider = MeterProviderBuilder::default().build();
    let metrics = Metrics::new(&provider);
    (provider, metrics)
}

pub fn init_metrics(otlp_endpoint: Option<&str>) -> Result<(SdkMeterProvider, Metrics), anyhow::Error> {
    let Some(endpoint) = otlp_endpoint else {
        return Ok(local_metrics());
    };

    let service_name =
        std::env::var("OTEL_SERVICE_NAME").unwrap_or_else(|_| "records-server".to_string());

    let resource = Resource::new(vec![KeyValue::new("service.name", service_name)]);

    let exporter = opentelemetry_otlp::MetricExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()?;

    let reader = PeriodicReader::builder(exporter, opentelemetry_sdk::runtime::Tokio)
        .with_interval(Duration::from_secs(15))
        .build();

    let provider = MeterProviderBuilder::default()
        .with_resource(resource)
        .with_reader(reader)
        .build();

    let metrics = Metrics::new(&provider);

    Ok((provider, metrics))
}
