pub mod record;
pub mod upload;

pub use record::{ExtractedData, ProcessingStatus, Record, RecordEnvelope, RecordId};
