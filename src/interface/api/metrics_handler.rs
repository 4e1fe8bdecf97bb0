//! Prometheus metrics handler

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use metrics::{counter, describe_counter, describe_gauge, gauge};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

/// Install the global Prometheus recorder
///
/// Can only succeed once per process.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    describe_metrics();
    Ok(handle)
}

fn describe_metrics() {
    describe_counter!(
        "friend_requests_total",
        "Friend requests accepted for processing, by outcome"
    );
    describe_counter!(
        "calls_initiated_total",
        "Call sessions issued, by call type"
    );
    describe_counter!(
        "call_credential_failures_total",
        "Call or channel credential requests that failed at the media provider"
    );
    describe_counter!("dm_messages_total", "Direct messages appended");
    describe_gauge!(
        "realtime_connections",
        "Number of open realtime connections"
    );
}

/// HTTP metrics handler
pub async fn metrics_handler(State(prometheus_handle): State<PrometheusHandle>) -> Response {
    let metrics = prometheus_handle.render();
    (StatusCode::OK, metrics).into_response()
}

pub fn record_friend_request(outcome: &'static str) {
    counter!("friend_requests_total", "outcome" => outcome).increment(1);
}

pub fn record_call_initiated(call_type: &'static str) {
    counter!("calls_initiated_total", "call_type" => call_type).increment(1);
}

pub fn record_credential_failure() {
    counter!("call_credential_failures_total").increment(1);
}

pub fn record_dm_message() {
    counter!("dm_messages_total").increment(1);
}

pub fn update_realtime_connections(count: usize) {
    gauge!("realtime_connections").set(count as f64);
}
