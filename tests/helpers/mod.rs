//! Shared helpers for the integration and E2E tests

#![allow(dead_code)]

use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

use medrec_ocr::poller::{PollSchedule, Poller};
use medrec_ocr::services::records::RecordsClient;

/// Get backend URL from env or default to localhost
pub fn backend_url() -> String {
    std::env::var("BACKEND_URL").unwrap_or_else(|_| "http://localhost:8000".to_string())
}

/// Same step shape as production, scaled down to milliseconds.
pub fn quick_schedule(max_attempts: u32) -> PollSchedule {
    PollSchedule {
        max_attempts,
        fast_interval: Duration::from_millis(20),
        medium_interval: Duration::from_millis(30),
        slow_interval: Duration::from_millis(40),
    }
}

pub fn poller_for(base_url: &str, schedule: PollSchedule) -> Poller<RecordsClient> {
    let client = RecordsClient::new(base_url, Duration::from_secs(5)).expect("client should build");
    Poller::new(Arc::new(client), schedule)
}

/// A small but genuine PNG, encoded on the fly.
pub fn sample_png() -> Vec<u8> {
    let img = image::RgbImage::from_fn(16, 16, |x, y| image::Rgb([(x * 16) as u8, (y * 16) as u8, 128]));
    let mut buf = Cursor::new(Vec::new());
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut buf, image::ImageFormat::Png)
        .expect("PNG encoding should succeed");
    buf.into_inner()
}
