//! Backend response bodies used by the integration tests

use serde_json::{json, Value};

pub const RECORD_ID: &str = "550e8400-e29b-41d4-a716-446655440000";

/// `GET /api/records/{id}` body with no extraction yet.
pub fn record_body(status: &str) -> Value {
    json!({
        "record": {
            "id": RECORD_ID,
            "original_image_url": "http://example.com/image.jpg",
            "uploaded_at": "2025-03-04T12:34:56.789Z",
            "processing_status": status
        },
        "extracted_data": []
    })
}

/// Completed record carrying one extraction.
pub fn completed_body(extracted_text: &str) -> Value {
    let mut body = record_body("completed");
    body["extracted_data"] = json!([{
        "id": "6ba7b810-9dad-11d1-80b4-00c04fd430c8",
        "record_id": RECORD_ID,
        "extracted_text": extracted_text,
        "extracted_at": "2025-03-04T12:40:00.000Z"
    }]);
    body
}
