use std::fmt;

use serde::Serialize;

use crate::models::record::{ProcessingStatus, RecordEnvelope, RecordId};

/// Attempts after which the busy screen mentions that extraction may be slow.
pub const LONG_WAIT_HINT_AFTER: u32 = 10;

/// Live state of one record's poll: `{loading, error, data}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewModel {
    pub record_id: RecordId,
    /// True while further fetches are still scheduled.
    pub loading: bool,
    /// Transport failure message; set at most once, and polling stops with it.
    pub error: Option<String>,
    /// Last snapshot the backend returned.
    pub data: Option<RecordEnvelope>,
    pub attempts: u32,
}

impl ViewModel {
    pub fn initial(record_id: RecordId) -> Self {
        Self {
            record_id,
            loading: true,
            error: None,
            data: None,
            attempts: 0,
        }
    }

    pub fn status(&self) -> Option<ProcessingStatus> {
        self.data.as_ref().map(RecordEnvelope::status)
    }

    pub fn image_url(&self) -> Option<&str> {
        self.data
            .as_ref()
            .and_then(|d| d.record.original_image_url.as_deref())
    }

    /// Resolve the view model to what the user should see.
    pub fn screen(&self, options: &ScreenOptions) -> Screen {
        if let Some(message) = &self.error {
            return Screen::TransportError {
                message: message.clone(),
                retryable: true,
            };
        }

        let Some(data) = &self.data else {
            return Screen::Busy {
                long_wait_hint: self.attempts >= options.long_wait_hint_after,
            };
        };

        match (data.status(), self.loading) {
            (ProcessingStatus::Pending | ProcessingStatus::Processing, true) => Screen::Busy {
                long_wait_hint: self.attempts >= options.long_wait_hint_after,
            },
            (ProcessingStatus::Pending, false) => Screen::Waiting,
            // Attempt cap reached mid-processing: keep the last busy view.
            (ProcessingStatus::Processing, false) => Screen::Busy {
                long_wait_hint: self.attempts >= options.long_wait_hint_after,
            },
            (ProcessingStatus::Failed, _) => Screen::JobFailed {
                admin_contact: options.admin_contact.clone(),
            },
            (ProcessingStatus::Completed, _) => match &data.extracted_data {
                Some(extracted) => Screen::Extracted {
                    content: render_extracted_text(&extracted.extracted_text),
                },
                None => Screen::Empty,
            },
        }
    }
}

/// Presentation knobs that are not part of the polled state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScreenOptions {
    pub long_wait_hint_after: u32,
    /// Shown on failed jobs when set (e.g. a `mailto:` link).
    pub admin_contact: Option<String>,
}

impl Default for ScreenOptions {
    fn default() -> Self {
        Self {
            long_wait_hint_after: LONG_WAIT_HINT_AFTER,
            admin_contact: None,
        }
    }
}

/// Render-ready outcome of [`ViewModel::screen`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Screen {
    Busy { long_wait_hint: bool },
    Waiting,
    JobFailed { admin_contact: Option<String> },
    Extracted { content: ExtractedView },
    Empty,
    TransportError { message: String, retryable: bool },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "format", content = "text", rename_all = "snake_case")]
pub enum ExtractedView {
    /// Extracted text parsed as JSON and pretty-printed.
    Structured(String),
    Verbatim(String),
}

impl ExtractedView {
    pub fn text(&self) -> &str {
        match self {
            ExtractedView::Structured(text) | ExtractedView::Verbatim(text) => text,
        }
    }
}

/// Interpret OCR output as JSON when possible; anything else is shown as-is.
pub fn render_extracted_text(text: &str) -> ExtractedView {
    serde_json::from_str::<serde_json::Value>(text)
        .ok()
        .and_then(|value| serde_json::to_string_pretty(&value).ok())
        .map(ExtractedView::Structured)
        .unwrap_or_else(|| ExtractedView::Verbatim(text.to_string()))
}

impl fmt::Display for Screen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Screen::Busy { long_wait_hint } => {
                write!(f, "Processing, please wait...")?;
                if *long_wait_hint {
                    write!(f, "\nThis may take a few minutes.")?;
                }
                Ok(())
            }
            Screen::Waiting => write!(f, "Waiting for processing to start."),
            Screen::JobFailed { admin_contact } => {
                write!(f, "Extraction failed. Please try again.")?;
                if let Some(contact) = admin_contact {
                    write!(f, "\nIf the problem persists, contact your administrator: {contact}")?;
                }
                Ok(())
            }
            Screen::Extracted { content } => f.write_str(content.text()),
            Screen::Empty => write!(f, "No text was extracted from this image."),
            Screen::TransportError { message, .. } => {
                write!(f, "Could not fetch the result: {message}\nReload to retry.")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::record::{ExtractedData, Record};

    fn snapshot(status: ProcessingStatus, text: Option<&str>) -> RecordEnvelope {
        RecordEnvelope {
            record: Record {
                id: RecordId::from("R1"),
                original_image_url: Some("http://example.com/r1.jpg".to_string()),
                processing_status: status,
                uploaded_at: None,
            },
            extracted_data: text.map(|t| ExtractedData {
                id: None,
                record_id: Some(RecordId::from("R1")),
                extracted_text: t.to_string(),
                extracted_at: None,
            }),
        }
    }

    fn view(status: ProcessingStatus, text: Option<&str>, loading: bool, attempts: u32) -> ViewModel {
        ViewModel {
            record_id: RecordId::from("R1"),
            loading,
            error: None,
            data: Some(snapshot(status, text)),
            attempts,
        }
    }

    #[test]
    fn test_json_text_is_pretty_printed() {
        let rendered = render_extracted_text(r#"{"a":1}"#);
        assert_eq!(rendered, ExtractedView::Structured("{\n  \"a\": 1\n}".to_string()));
    }

    #[test]
    fn test_plain_text_is_verbatim() {
        assert_eq!(
            render_extracted_text("plain note"),
            ExtractedView::Verbatim("plain note".to_string())
        );
        assert_eq!(
            render_extracted_text("{\"broken\": "),
            ExtractedView::Verbatim("{\"broken\": ".to_string())
        );
    }

    #[test]
    fn test_no_data_is_busy() {
        let options = ScreenOptions::default();
        let mut model = ViewModel::initial(RecordId::from("R1"));
        assert_eq!(model.screen(&options), Screen::Busy { long_wait_hint: false });

        model.attempts = 10;
        assert_eq!(model.screen(&options), Screen::Busy { long_wait_hint: true });
    }

    #[test]
    fn test_in_flight_statuses_are_busy_while_loading() {
        let options = ScreenOptions::default();
        for status in [ProcessingStatus::Pending, ProcessingStatus::Processing] {
            assert_eq!(
                view(status, None, true, 3).screen(&options),
                Screen::Busy { long_wait_hint: false }
            );
            assert_eq!(
                view(status, None, true, 11).screen(&options),
                Screen::Busy { long_wait_hint: true }
            );
        }
    }

    #[test]
    fn test_pending_after_polling_stops_is_waiting() {
        let options = ScreenOptions::default();
        assert_eq!(
            view(ProcessingStatus::Pending, None, false, 20).screen(&options),
            Screen::Waiting
        );
    }

    #[test]
    fn test_processing_after_cap_keeps_busy_view() {
        let options = ScreenOptions::default();
        assert_eq!(
            view(ProcessingStatus::Processing, None, false, 20).screen(&options),
            Screen::Busy { long_wait_hint: true }
        );
    }

    #[test]
    fn test_failed_job_offers_admin_contact() {
        let options = ScreenOptions {
            admin_contact: Some("mailto:admin@example.com".to_string()),
            ..ScreenOptions::default()
        };
        let screen = view(ProcessingStatus::Failed, None, false, 2).screen(&options);
        assert_eq!(
            screen,
            Screen::JobFailed {
                admin_contact: Some("mailto:admin@example.com".to_string())
            }
        );
        assert!(screen.to_string().contains("contact your administrator"));
    }

    #[test]
    fn test_completed_screens() {
        let options = ScreenOptions::default();
        assert_eq!(
            view(ProcessingStatus::Completed, Some("Dx: flu"), false, 2).screen(&options),
            Screen::Extracted {
                content: ExtractedView::Verbatim("Dx: flu".to_string())
            }
        );
        assert_eq!(
            view(ProcessingStatus::Completed, None, false, 2).screen(&options),
            Screen::Empty
        );
    }

    #[test]
    fn test_transport_error_wins_over_stale_data() {
        let mut model = view(ProcessingStatus::Processing, None, false, 4);
        model.error = Some("connection refused".to_string());
        let screen = model.screen(&ScreenOptions::default());
        assert_eq!(
            screen,
            Screen::TransportError {
                message: "connection refused".to_string(),
                retryable: true
            }
        );
        assert!(screen.to_string().contains("Reload to retry"));
    }

    #[test]
    fn test_screen_serializes_with_kind_tag() {
        let screen = Screen::Extracted {
            content: render_extracted_text(r#"{"a":1}"#),
        };
        let value = serde_json::to_value(&screen).unwrap();
        assert_eq!(value["kind"], "extracted");
        assert_eq!(value["content"]["format"], "structured");
    }
}
