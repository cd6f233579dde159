use std::fmt;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use strum::{Display, EnumString};

/// Opaque identifier of an uploaded medical record.
///
/// The backend hands out UUID strings, but nothing here depends on that;
/// integer ids are accepted and kept in their decimal form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

impl From<String> for RecordId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for RecordId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl<'de> Deserialize<'de> for RecordId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct RecordIdVisitor;

        impl Visitor<'_> for RecordIdVisitor {
            type Value = RecordId;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a record id string or integer")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<RecordId, E> {
                Ok(RecordId::from(v))
            }

            fn visit_string<E: de::Error>(self, v: String) -> Result<RecordId, E> {
                Ok(RecordId(v))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<RecordId, E> {
                Ok(RecordId(v.to_string()))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<RecordId, E> {
                Ok(RecordId(v.to_string()))
            }
        }

        deserializer.deserialize_any(RecordIdVisitor)
    }
}

/// Processing state of a record on the backend.
///
/// Transitions are monotonic: `pending → processing → {completed, failed}`.
/// Older backend builds write `"error"` for the failed state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ProcessingStatus {
    Pending,
    Processing,
    Completed,
    #[serde(alias = "error")]
    #[strum(to_string = "failed", serialize = "error")]
    Failed,
}

impl ProcessingStatus {
    /// No further transitions are expected once a record reaches this state.
    pub fn is_terminal(self) -> bool {
        match self {
            ProcessingStatus::Completed | ProcessingStatus::Failed => true,
            ProcessingStatus::Pending | ProcessingStatus::Processing => false,
        }
    }
}

/// A medical record row as returned by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: RecordId,
    #[serde(default)]
    pub original_image_url: Option<String>,
    pub processing_status: ProcessingStatus,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub uploaded_at: Option<DateTime<Utc>>,
}

/// OCR output attached to a record. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedData {
    #[serde(default)]
    pub id: Option<RecordId>,
    #[serde(default)]
    pub record_id: Option<RecordId>,
    /// Raw model output; frequently a JSON document encoded as a string.
    pub extracted_text: String,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub extracted_at: Option<DateTime<Utc>>,
}

/// Body of `GET /api/records/{record_id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordEnvelope {
    pub record: Record,
    #[serde(
        default,
        deserialize_with = "zero_or_one",
        serialize_with = "as_array"
    )]
    pub extracted_data: Option<ExtractedData>,
}

impl RecordEnvelope {
    pub fn status(&self) -> ProcessingStatus {
        self.record.processing_status
    }
}

/// Body of `GET /api/records`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordList {
    pub records: Vec<Record>,
}

/// `GET /api/health` on the backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendHealth {
    pub status: String,
    #[serde(default)]
    pub timestamp: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    Many(Vec<ExtractedData>),
    One(ExtractedData),
}

// `null`, a missing field and `[]` all mean "nothing extracted yet".
fn zero_or_one<'de, D>(deserializer: D) -> Result<Option<ExtractedData>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
        None => None,
        Some(OneOrMany::One(data)) => Some(data),
        Some(OneOrMany::Many(items)) => items.into_iter().next(),
    })
}

fn as_array<S>(data: &Option<ExtractedData>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.collect_seq(data.iter())
}

fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(parse_timestamp))
}

/// Parse RFC 3339, falling back to a zone-less ISO timestamp taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|naive| naive.and_utc())
        })
}
