use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode, Url};
use serde::de::DeserializeOwned;

use crate::models::record::{BackendHealth, Record, RecordEnvelope, RecordId, RecordList};
use crate::models::upload::{ImageUpload, UploadResponse};
use crate::poller::RecordSource;

/// Client for the medical record OCR backend (`/api/...`).
#[derive(Debug, Clone)]
pub struct RecordsClient {
    http: Client,
    base_url: Url,
}

impl RecordsClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        let http = Client::builder().timeout(timeout).build()?;
        Self::with_client(base_url, http)
    }

    pub fn with_client(base_url: &str, http: Client) -> Result<Self, ClientError> {
        let base_url =
            Url::parse(base_url).map_err(|e| ClientError::InvalidUrl(format!("{base_url}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::InvalidUrl(base_url.to_string()));
        }
        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Build `{base}/api/{segments...}` with each segment percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ClientError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ClientError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .push("api")
            .extend(segments);
        Ok(url)
    }

    /// GET /api/records/{record_id}
    pub async fn get_record(&self, record_id: &RecordId) -> Result<RecordEnvelope, ClientError> {
        let url = self.endpoint(&["records", record_id.as_str()])?;
        let response = self.http.get(url).send().await?;
        handle_response(response).await
    }

    /// GET /api/records?limit=&offset=
    pub async fn list_records(&self, limit: u32, offset: u32) -> Result<Vec<Record>, ClientError> {
        let url = self.endpoint(&["records"])?;
        let response = self
            .http
            .get(url)
            .query(&[("limit", limit), ("offset", offset)])
            .send()
            .await?;
        let list: RecordList = handle_response(response).await?;
        Ok(list.records)
    }

    /// POST /api/upload — returns the new record's id.
    pub async fn upload(&self, upload: &ImageUpload) -> Result<UploadResponse, ClientError> {
        let url = self.endpoint(&["upload"])?;
        let part = Part::bytes(upload.bytes.clone())
            .file_name(upload.file_name.clone())
            .mime_str(upload.content_type())?;
        let form = Form::new().part("file", part);

        let response = self.http.post(url).multipart(form).send().await?;
        handle_response(response).await
    }

    /// POST /api/process/{record_id} — ask the backend to run OCR again.
    pub async fn reprocess(&self, record_id: &RecordId) -> Result<UploadResponse, ClientError> {
        let url = self.endpoint(&["process", record_id.as_str()])?;
        let response = self.http.post(url).send().await?;
        handle_response(response).await
    }

    /// GET /api/health
    pub async fn health(&self) -> Result<BackendHealth, ClientError> {
        let url = self.endpoint(&["health"])?;
        let response = self.http.get(url).send().await?;
        handle_response(response).await
    }
}

#[async_trait]
impl RecordSource for RecordsClient {
    async fn fetch_record(&self, record_id: &RecordId) -> Result<RecordEnvelope, ClientError> {
        self.get_record(record_id).await
    }
}

async fn handle_response<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ClientError> {
    let status = response.status();
    let body = response.bytes().await?;

    if !status.is_success() {
        let message = error_detail(&body);
        return Err(if status == StatusCode::NOT_FOUND {
            ClientError::NotFound(message)
        } else {
            ClientError::Api {
                status: status.as_u16(),
                message,
            }
        });
    }

    Ok(serde_json::from_slice(&body)?)
}

/// Prefer the backend's `{"detail": ...}` message over the raw body.
fn error_detail(body: &[u8]) -> String {
    serde_json::from_slice::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("detail").and_then(|d| d.as_str()).map(str::to_owned))
        .unwrap_or_else(|| String::from_utf8_lossy(body).trim().to_string())
}

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Backend returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Failed to decode backend response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Invalid backend URL: {0}")]
    InvalidUrl(String),
}

impl ClientError {
    /// HTTP status the backend answered with, if it answered at all.
    pub fn upstream_status(&self) -> Option<u16> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            ClientError::NotFound(_) => Some(404),
            ClientError::Http(e) => e.status().map(|s| s.as_u16()),
            ClientError::Decode(_) | ClientError::InvalidUrl(_) => None,
        }
    }
}
