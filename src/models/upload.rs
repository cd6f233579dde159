use garde::Validate;
use image::ImageFormat;
use serde::{Deserialize, Serialize};

use crate::models::record::RecordId;

/// Largest image the backend accepts (10 MiB).
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

const ALLOWED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

/// A photographed medical record ready to be sent to `POST /api/upload`.
#[derive(Debug, Clone, Validate)]
pub struct ImageUpload {
    #[garde(length(min = 1, max = 255), custom(allowed_extension))]
    pub file_name: String,

    #[garde(length(min = 1, max = 10485760))]
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }

    /// Run the declarative checks, then sniff the bytes.
    pub fn check(&self) -> Result<ImageFormat, UploadError> {
        self.validate().map_err(UploadError::Invalid)?;

        match image::guess_format(&self.bytes) {
            Ok(format @ (ImageFormat::Jpeg | ImageFormat::Png)) => Ok(format),
            Ok(other) => Err(UploadError::UnsupportedFormat(format!("{other:?}"))),
            Err(_) => Err(UploadError::UnsupportedFormat("unknown".to_string())),
        }
    }

    /// MIME type implied by the file extension.
    pub fn content_type(&self) -> &'static str {
        match extension(&self.file_name).as_deref() {
            Some("png") => "image/png",
            _ => "image/jpeg",
        }
    }
}

fn extension(file_name: &str) -> Option<String> {
    file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
}

fn allowed_extension(value: &str, _ctx: &()) -> garde::Result {
    match extension(value) {
        Some(ext) if ALLOWED_EXTENSIONS.contains(&ext.as_str()) => Ok(()),
        _ => Err(garde::Error::new("only JPG and PNG files are allowed")),
    }
}

/// Response of `POST /api/upload` and `POST /api/process/{record_id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadResponse {
    pub record_id: RecordId,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("Invalid upload: {0}")]
    Invalid(garde::Report),

    #[error("Unsupported image format: {0}")]
    UnsupportedFormat(String),
}
