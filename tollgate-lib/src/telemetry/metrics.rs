use opentelemetry::global;
use opentelemetry::metrics::{Counter, Gauge, Histogram, Meter, UpDownCounter};
use opentelemetry::KeyValue;
use opentelemetry_sdk::metrics::SdkMeterProvider;
use prometheus::Registry;
use std::sync::Arc;

pub mod labels {
    pub const ERROR_TYPE: &str = "error_type";
    pub const STATUS_CODE: &str = "status_code";
    pub const METHOD: &str = "method";
    pub const REASON: &str = "reason";
    pub const VERSION: &str = "version";
    pub const RUST_VERSION: &str = "rust_version";
}

pub mod values {
    pub const ERROR_RATE_LIMITED: &str = "rate_limited";
    pub const ERROR_PANIC: &str = "panic";
    pub const REASON_CONNECTION_LIMIT: &str = "connection_limit";
    pub const REASON_SHUTDOWN: &str = "shutdown";
}

#[derive(Clone)]
pub struct Metrics {
    pub requests_received_total: Counter<u64>,
    pub responses_sent_total: Counter<u64>,
    pub processing_time_seconds: Histogram<f64>,
    pub responses_sent_by_status_total: Counter<u64>,

    pub connections_total: Counter<u64>,
    pub connections_active: UpDownCounter<i64>,
    pub connections_rejected_total: Counter<u64>,

    // Rate limiting metrics
    pub rate_limit_allowed_total: Counter<u64>,
    pub rate_limit_rejected_total: Counter<u64>,

    pub errors_total: Counter<u64>,

    // Build info
    pub build_info: Gauge<u64>,
}

impl Metrics {
    pub fn new(meter: Meter) -> Self {
        Self {
            requests_received_total: meter
                .u64_counter("tollgate_requests_received_total")
                .with_description("Total number of requests received")
                .build(),
            responses_sent_total: meter
                .u64_counter("tollgate_responses_sent_total")
                .with_description("Total number of responses sent")
                .build(),
            processing_time_seconds: meter
                .f64_histogram("tollgate_processing_time_seconds")
                .with_description("Time from request received to response produced, in seconds")
                .build(),
            responses_sent_by_status_total: meter
                .u64_counter("tollgate_responses_sent_by_status_total")
                .with_description("Total number of responses sent, by status code")
                .build(),

            connections_total: meter
                .u64_counter("tollgate_connections_total")
                .with_description("Total number of connections accepted")
                .build(),
            connections_active: meter
                .i64_up_down_counter("tollgate_connections_active")
                .with_description("Number of active connections")
                .build(),
            connections_rejected_total: meter
                .u64_counter("tollgate_connections_rejected_total")
                .with_description("Connections rejected by the limit or during shutdown")
                .build(),

            rate_limit_allowed_total: meter
                .u64_counter("tollgate_rate_limit_allowed_total")
                .with_description("Total number of requests allowed by rate limiter")
                .build(),
            rate_limit_rejected_total: meter
                .u64_counter("tollgate_rate_limit_rejected_total")
                .with_description("Total number of requests rejected by rate limiter (429)")
                .build(),

            errors_total: meter
                .u64_counter("tollgate_errors_total")
                .with_description("Total number of errors by type")
                .build(),

            build_info: meter
                .u64_gauge("tollgate_build_info")
                .with_description("Build information (version, rust version)")
                .build(),
        }
    }

    /// Set build info metric with version labels
    pub fn set_build_info(&self) {
        let version = env!("CARGO_PKG_VERSION");
        let rust_version = env!("CARGO_PKG_RUST_VERSION");

        self.build_info.record(
            1,
            &[
                KeyValue::new(labels::VERSION, version),
                KeyValue::new(labels::RUST_VERSION, rust_version),
            ],
        );
    }

    pub fn record_request_received(&self) {
        self.requests_received_total.add(1, &[]);
    }

    pub fn record_response_sent(&self, method: &str, status_code: u16, duration: f64) {
        self.responses_sent_total.add(1, &[]);
        self.responses_sent_by_status_total
            .add(1, &[KeyValue::new(labels::STATUS_CODE, status_code.to_string())]);
        self.processing_time_seconds.record(
            duration,
            &[
                KeyValue::new(labels::METHOD, method.to_string()),
                KeyValue::new(labels::STATUS_CODE, status_code.to_string()),
            ],
        );
    }

    pub fn record_rate_limit_allowed(&self) {
        self.rate_limit_allowed_total.add(1, &[]);
    }

    pub fn record_rate_limit_rejection(&self) {
        self.errors_total
            .add(1, &[KeyValue::new(labels::ERROR_TYPE, values::ERROR_RATE_LIMITED)]);
        self.rate_limit_rejected_total.add(1, &[]);
    }

    pub fn record_connection_opened(&self) {
        self.connections_total.add(1, &[]);
        self.connections_active.add(1, &[]);
    }

    pub fn record_connection_closed(&self) {
        self.connections_active.add(-1, &[]);
    }

    pub fn record_connection_rejected(&self, reason: &str) {
        self.connections_rejected_total
            .add(1, &[KeyValue::new(labels::REASON, reason.to_string())]);
    }

    pub fn record_error(&self, error_type: &str) {
        self.errors_total
            .add(1, &[KeyValue::new(labels::ERROR_TYPE, error_type.to_string())]);
    }
}

pub fn init_metrics() -> Result<(Arc<Metrics>, Registry), Box<dyn std::error::Error + Send + Sync>>
{
    let registry = Registry::default();

    let exporter = opentelemetry_prometheus::exporter()
        .with_registry(registry.clone())
        .build()?;

    let meter_provider = SdkMeterProvider::builder().with_reader(exporter).build();

    global::set_meter_provider(meter_provider);

    let meter = global::meter("tollgate");
    let metrics = Arc::new(Metrics::new(meter));

    metrics.set_build_info();

    Ok((metrics, registry))
}
