use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use tracing::{info, warn};

use crate::app_state::AppState;
use crate::models::record::{RecordEnvelope, RecordId, RecordList};
use crate::models::upload::{ImageUpload, UploadError, UploadResponse};
use crate::services::records::ClientError;

/// POST /api/upload — validate a record image and hand it to the backend.
pub async fn upload_record(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, StatusCode> {
    let mut upload: Option<ImageUpload> = None;

    while let Some(field) = multipart.next_field().await.map_err(|_| StatusCode::BAD_REQUEST)? {
        if field.name() == Some("file") {
            let file_name = field.file_name().unwrap_or_default().to_string();
            let data = field.bytes().await.map_err(|_| StatusCode::BAD_REQUEST)?;
            upload = Some(ImageUpload::new(file_name, data.to_vec()));
        }
    }

    let upload = upload.ok_or(StatusCode::BAD_REQUEST)?;

    if let Err(e) = upload.check() {
        warn!(file_name = %upload.file_name, error = %e, "Rejected upload");
        metrics::counter!("upload_rejected_total").increment(1);
        return Err(match e {
            UploadError::Invalid(_) => StatusCode::BAD_REQUEST,
            UploadError::UnsupportedFormat(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
        });
    }

    let response = state.records.upload(&upload).await.map_err(upstream_error)?;
    metrics::counter!("uploads_forwarded_total").increment(1);
    info!(
        record_id = %response.record_id,
        size_bytes = upload.bytes.len(),
        "Record image uploaded"
    );

    Ok(Json(response))
}

/// GET /api/records/{record_id}
pub async fn get_record(
    State(state): State<AppState>,
    Path(record_id): Path<String>,
) -> Result<Json<RecordEnvelope>, StatusCode> {
    state
        .records
        .get_record(&RecordId::from(record_id))
        .await
        .map(Json)
        .map_err(upstream_error)
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default)]
    pub offset: u32,
}

fn default_limit() -> u32 {
    10
}

/// GET /api/records?limit=&offset=
pub async fn list_records(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<RecordList>, StatusCode> {
    let records = state
        .records
        .list_records(params.limit, params.offset)
        .await
        .map_err(upstream_error)?;
    Ok(Json(RecordList { records }))
}

/// POST /api/process/{record_id}
pub async fn reprocess_record(
    State(state): State<AppState>,
    Path(record_id): Path<String>,
) -> Result<Json<UploadResponse>, StatusCode> {
    let record_id = RecordId::from(record_id);
    let response = state
        .records
        .reprocess(&record_id)
        .await
        .map_err(upstream_error)?;
    info!(record_id = %record_id, "Reprocessing requested");
    Ok(Json(response))
}

/// Pass backend 4xx answers through; everything else is a bad gateway.
fn upstream_error(err: ClientError) -> StatusCode {
    warn!(error = %err, "Backend request failed");
    err.upstream_status()
        .and_then(|code| StatusCode::from_u16(code).ok())
        .filter(StatusCode::is_client_error)
        .unwrap_or(StatusCode::BAD_GATEWAY)
}
