//! Logging and metrics setup.

use metrics::{describe_counter, describe_gauge, describe_histogram, Unit};
use std::net::SocketAddr;
use tracing_subscriber::EnvFilter;

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};

pub const CONNECTIONS_TOTAL: &str = "simscan_connections_total";
pub const REQUESTS_TOTAL: &str = "simscan_requests_total";
pub const PARSE_ERRORS_TOTAL: &str = "simscan_parse_errors_total";
pub const SEND_ERRORS_TOTAL: &str = "simscan_send_errors_total";
pub const QUEUE_DEPTH: &str = "simscan_queue_depth";
pub const DETECTION_SECONDS: &str = "simscan_detection_seconds";

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over `config.log_level`. Calling this more
/// than once is harmless; later calls leave the first subscriber in place.
pub fn init_tracing(config: &ServerConfig) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(true)
        .with_thread_names(true);

    let result = if config.log_json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    if result.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}

/// Start the Prometheus exporter with its scrape listener on `addr` and
/// describe the server metrics. Must run inside a tokio runtime.
pub fn install_metrics_exporter(addr: &str) -> ServerResult<()> {
    let addr: SocketAddr = addr
        .parse()
        .map_err(|err| ServerError::Config(format!("Invalid metrics address {addr}: {err}")))?;

    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|err| ServerError::Metrics(err.to_string()))?;

    describe_metrics();
    tracing::info!(%addr, "prometheus exporter listening");
    Ok(())
}

fn describe_metrics() {
    describe_counter!(CONNECTIONS_TOTAL, "Accepted TCP connections");
    describe_counter!(REQUESTS_TOTAL, "Requests answered by a worker, by status");
    describe_counter!(PARSE_ERRORS_TOTAL, "Requests rejected before reaching the queue");
    describe_counter!(SEND_ERRORS_TOTAL, "Responses that could not be written");
    describe_gauge!(QUEUE_DEPTH, "Tasks waiting for a worker");
    describe_histogram!(
        DETECTION_SECONDS,
        Unit::Seconds,
        "Time spent in plagiarism detection per request"
    );
}
