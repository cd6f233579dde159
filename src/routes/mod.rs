pub mod client_events;
pub mod health;
pub mod metrics;
pub mod records;
pub mod results;

use axum::extract::DefaultBodyLimit;
use axum::response::Html;
use axum::routing::{get, post};
use axum::Router;

use crate::app_state::AppState;
use crate::models::upload::MAX_UPLOAD_BYTES;

/// Multipart framing on top of the largest accepted image.
pub const UPLOAD_BODY_LIMIT: usize = MAX_UPLOAD_BYTES + 64 * 1024;

/// Page and API routes. Metrics and middleware layers are added by the binary.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(|| async { Html(include_str!("../../static/index.html")) }))
        .route("/health", get(health::health_check))
        .route(
            "/api/upload",
            post(records::upload_record).layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
        )
        .route("/api/records", get(records::list_records))
        .route("/api/records/{record_id}", get(records::get_record))
        .route("/api/process/{record_id}", post(records::reprocess_record))
        .route("/api/results/{record_id}", get(results::stream_results))
        .route("/api/client-events", post(client_events::record_client_event))
        .with_state(state)
}
