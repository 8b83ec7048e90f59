//! Metrics collection: per-run test counts, per-test duration histograms,
//! and transport byte/request counters, exported via an optional
//! Prometheus listener (§4.7).

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::error::Error;

static METRICS_INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Initializes the global metrics recorder.
///
/// When `addr` is `Some`, a Prometheus HTTP listener is started there.
/// When `None`, the recorder is installed without an HTTP endpoint so
/// metrics are still recorded (and readable via `metrics-util` test
/// snapshots) without exposing a port.
///
/// # Errors
///
/// Returns [`Error::Io`] if the recorder or HTTP listener can't be
/// installed (e.g. the address is already in use).
pub fn init_metrics(addr: Option<std::net::SocketAddr>) -> Result<(), Error> {
    if METRICS_INITIALIZED.swap(true, Ordering::SeqCst) {
        tracing::debug!("metrics already initialized, skipping");
        return Ok(());
    }
    addr.map_or_else(
        || PrometheusBuilder::new().install_recorder().map(|_| ()),
        |a| PrometheusBuilder::new().with_http_listener(a).install(),
    )
    .map_err(|e| Error::Io(std::io::Error::other(e.to_string())))?;

    describe_metrics();
    Ok(())
}

fn describe_metrics() {
    describe_counter!("mcpconform_tests_total", "Total conformance test cases run");
    describe_counter!(
        "mcpconform_tests_by_outcome_total",
        "Conformance test cases by outcome"
    );
    describe_histogram!(
        "mcpconform_test_duration_ms",
        "Per-test wall-clock duration in milliseconds"
    );
    describe_counter!(
        "mcpconform_transport_requests_total",
        "Requests sent to the target server, by transport kind"
    );
    describe_counter!(
        "mcpconform_transport_bytes_total",
        "Bytes written to the target server, by transport kind"
    );
}

/// Records one completed test case.
pub fn record_test(name: &str, outcome: &str, duration: Duration) {
    counter!("mcpconform_tests_total").increment(1);
    counter!("mcpconform_tests_by_outcome_total", "outcome" => outcome.to_owned()).increment(1);
    histogram!("mcpconform_test_duration_ms", "test" => name.to_owned())
        .record(duration.as_secs_f64() * 1000.0);
}

/// Records one request written to the target server.
pub fn record_transport_request(transport_kind: &str, bytes: u64) {
    counter!("mcpconform_transport_requests_total", "transport" => transport_kind.to_owned())
        .increment(1);
    counter!("mcpconform_transport_bytes_total", "transport" => transport_kind.to_owned())
        .increment(bytes);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_functions_do_not_panic_without_a_recorder() {
        record_test("initialization::handshake_succeeds", "pass", Duration::from_millis(12));
        record_transport_request("http", 256);
    }
}
