use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use metrics_exporter_prometheus::PrometheusHandle;

/// Register descriptions for every metric this crate emits.
pub fn describe_metrics() {
    metrics::describe_counter!(
        "result_poll_attempts_total",
        "Record status fetches issued by result polls"
    );
    metrics::describe_counter!(
        "result_polls_finished_total",
        "Result polls that stopped, labelled by outcome"
    );
    metrics::describe_counter!(
        "uploads_forwarded_total",
        "Record images forwarded to the OCR backend"
    );
    metrics::describe_counter!(
        "upload_rejected_total",
        "Record images rejected before reaching the backend"
    );
}

/// Prometheus scrape endpoint (text exposition format).
pub async fn prometheus_metrics(State(handle): State<Arc<PrometheusHandle>>) -> impl IntoResponse {
    handle.render()
}
