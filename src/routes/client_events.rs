use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use tracing::{info, warn};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientEventKind {
    ImageLoaded,
    ImageError,
}

/// Diagnostic beacon from the page; never shown to the user.
#[derive(Debug, Deserialize)]
pub struct ClientEvent {
    pub kind: ClientEventKind,
    #[serde(default)]
    pub record_id: Option<String>,
    #[serde(default)]
    pub src: Option<String>,
}

/// POST /api/client-events
pub async fn record_client_event(Json(event): Json<ClientEvent>) -> StatusCode {
    let record_id = event.record_id.as_deref().unwrap_or("-");
    let src = event.src.as_deref().unwrap_or("-");

    match event.kind {
        ClientEventKind::ImageLoaded => {
            info!(record_id, src, "Record image loaded in browser")
        }
        ClientEventKind::ImageError => {
            warn!(record_id, src, "Record image failed to load in browser")
        }
    }

    StatusCode::NO_CONTENT
}
