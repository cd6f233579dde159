//! Result polling for asynchronous OCR jobs.
//!
//! A [`Poller`] repeatedly fetches one record's status until the record
//! reaches a terminal state, the attempt cap is hit, or a fetch fails.
//! Each poll publishes its [`ViewModel`] on its own `watch` channel and
//! is torn down through a [`CancellationToken`]: cancelling drops any
//! in-flight fetch, so a superseded poll can never publish a late result.

pub mod schedule;
pub mod view;
pub mod watcher;

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::models::record::{ProcessingStatus, RecordEnvelope, RecordId};
use crate::services::records::ClientError;

pub use schedule::PollSchedule;
pub use view::{ExtractedView, Screen, ScreenOptions, ViewModel};
pub use watcher::ResultWatcher;

/// Read-only access to record status.
#[async_trait]
pub trait RecordSource: Send + Sync + 'static {
    async fn fetch_record(&self, record_id: &RecordId) -> Result<RecordEnvelope, ClientError>;
}

/// Why a poll stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "status", rename_all = "snake_case")]
pub enum PollOutcome {
    /// The record reached `completed` or `failed`.
    Finished(ProcessingStatus),
    /// The attempt cap was hit; carries the last status seen.
    AttemptCapReached(ProcessingStatus),
    TransportFailed,
    Cancelled,
}

impl PollOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            PollOutcome::Finished(ProcessingStatus::Failed) => "job_failed",
            PollOutcome::Finished(_) => "completed",
            PollOutcome::AttemptCapReached(_) => "attempt_cap",
            PollOutcome::TransportFailed => "transport_failed",
            PollOutcome::Cancelled => "cancelled",
        }
    }
}

pub struct Poller<S> {
    source: Arc<S>,
    schedule: PollSchedule,
}

impl<S> Clone for Poller<S> {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
            schedule: self.schedule,
        }
    }
}

impl<S: RecordSource> Poller<S> {
    pub fn new(source: Arc<S>, schedule: PollSchedule) -> Self {
        Self { source, schedule }
    }

    pub fn schedule(&self) -> &PollSchedule {
        &self.schedule
    }

    /// Spawn a poll for `record_id` on the current runtime.
    pub fn start(&self, record_id: RecordId) -> PollHandle {
        let (updates, view) = watch::channel(ViewModel::initial(record_id.clone()));
        let cancel = CancellationToken::new();

        let poller = self.clone();
        let task_cancel = cancel.clone();
        let task_id = record_id.clone();
        let task = tokio::spawn(async move { poller.run(task_id, updates, task_cancel).await });

        PollHandle {
            record_id,
            view,
            cancel,
            task: Some(task),
        }
    }

    /// Drive a poll to completion, publishing every state change on `updates`.
    pub async fn run(
        &self,
        record_id: RecordId,
        updates: watch::Sender<ViewModel>,
        cancel: CancellationToken,
    ) -> PollOutcome {
        info!(record_id = %record_id, "Starting result poll");
        let outcome = self.poll_loop(&record_id, &updates, &cancel).await;

        metrics::counter!("result_polls_finished_total", "outcome" => outcome.label())
            .increment(1);
        info!(
            record_id = %record_id,
            outcome = outcome.label(),
            attempts = updates.borrow().attempts,
            "Result poll stopped"
        );
        outcome
    }

    async fn poll_loop(
        &self,
        record_id: &RecordId,
        updates: &watch::Sender<ViewModel>,
        cancel: &CancellationToken,
    ) -> PollOutcome {
        let mut attempts: u32 = 0;

        loop {
            let fetched = tokio::select! {
                biased;
                _ = cancel.cancelled() => return PollOutcome::Cancelled,
                fetched = self.source.fetch_record(record_id) => fetched,
            };
            attempts += 1;
            metrics::counter!("result_poll_attempts_total").increment(1);

            let envelope = match fetched {
                Ok(envelope) => envelope,
                Err(e) => {
                    warn!(record_id = %record_id, attempt = attempts, error = %e, "Status fetch failed, stopping poll");
                    updates.send_modify(|view| {
                        view.loading = false;
                        view.error = Some(e.to_string());
                        view.attempts = attempts;
                    });
                    return PollOutcome::TransportFailed;
                }
            };

            let status = envelope.status();
            let exhausted = self.schedule.is_exhausted(attempts);
            debug!(record_id = %record_id, attempt = attempts, status = %status, "Fetched record status");

            updates.send_modify(|view| {
                view.loading = !(status.is_terminal() || exhausted);
                view.data = Some(envelope);
                view.attempts = attempts;
            });

            if status.is_terminal() {
                return PollOutcome::Finished(status);
            }
            if exhausted {
                info!(record_id = %record_id, status = %status, "Attempt cap reached");
                return PollOutcome::AttemptCapReached(status);
            }

            let delay = self.schedule.interval_for_attempt(attempts);
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return PollOutcome::Cancelled,
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }
}

/// Owner of a running poll. Dropping the handle cancels the poll.
pub struct PollHandle {
    record_id: RecordId,
    view: watch::Receiver<ViewModel>,
    cancel: CancellationToken,
    task: Option<JoinHandle<PollOutcome>>,
}

impl PollHandle {
    pub fn record_id(&self) -> &RecordId {
        &self.record_id
    }

    /// Snapshot of the current view model.
    pub fn view(&self) -> ViewModel {
        self.view.borrow().clone()
    }

    /// Receiver for view model changes. The channel closes when the poll stops.
    pub fn subscribe(&self) -> watch::Receiver<ViewModel> {
        self.view.clone()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Wait for the poll task to stop.
    pub async fn finished(mut self) -> PollOutcome {
        let Some(task) = self.task.take() else {
            return PollOutcome::Cancelled;
        };
        match task.await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(record_id = %self.record_id, error = %e, "Poll task did not complete");
                PollOutcome::Cancelled
            }
        }
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex;

    use tokio::sync::Notify;

    use super::*;
    use crate::models::record::{ExtractedData, Record};

    pub enum Step {
        Respond(Result<RecordEnvelope, ClientError>),
        /// Hold the response until the notify fires.
        Hold(Arc<Notify>, RecordEnvelope),
    }

    /// Record source that replays a fixed script per record id.
    #[derive(Default)]
    pub struct ScriptedSource {
        scripts: Mutex<HashMap<RecordId, VecDeque<Step>>>,
        calls: Mutex<Vec<RecordId>>,
    }

    impl ScriptedSource {
        pub fn push(&self, record_id: &str, step: Step) {
            self.scripts
                .lock()
                .unwrap()
                .entry(RecordId::from(record_id))
                .or_default()
                .push_back(step);
        }

        pub fn respond(&self, record_id: &str, envelope: RecordEnvelope) {
            self.push(record_id, Step::Respond(Ok(envelope)));
        }

        pub fn fail(&self, record_id: &str) {
            self.push(
                record_id,
                Step::Respond(Err(ClientError::Api {
                    status: 502,
                    message: "bad gateway".to_string(),
                })),
            );
        }

        pub fn calls(&self) -> usize {
            self.calls.lock().unwrap().len()
        }

        pub fn calls_for(&self, record_id: &str) -> usize {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .filter(|id| id.as_str() == record_id)
                .count()
        }
    }

    #[async_trait]
    impl RecordSource for ScriptedSource {
        async fn fetch_record(&self, record_id: &RecordId) -> Result<RecordEnvelope, ClientError> {
            self.calls.lock().unwrap().push(record_id.clone());
            let step = self
                .scripts
                .lock()
                .unwrap()
                .get_mut(record_id)
                .and_then(VecDeque::pop_front);

            match step {
                Some(Step::Respond(result)) => result,
                Some(Step::Hold(gate, envelope)) => {
                    gate.notified().await;
                    Ok(envelope)
                }
                None => Err(ClientError::Api {
                    status: 500,
                    message: format!("script exhausted for {record_id}"),
                }),
            }
        }
    }

    pub fn envelope(record_id: &str, status: ProcessingStatus, text: Option<&str>) -> RecordEnvelope {
        RecordEnvelope {
            record: Record {
                id: RecordId::from(record_id),
                original_image_url: Some(format!("http://example.com/{record_id}.jpg")),
                processing_status: status,
                uploaded_at: None,
            },
            extracted_data: text.map(|t| ExtractedData {
                id: None,
                record_id: Some(RecordId::from(record_id)),
                extracted_text: t.to_string(),
                extracted_at: None,
            }),
        }
    }

    /// Let spawned tasks run until `source` has seen `n` calls.
    pub async fn wait_for_calls(source: &ScriptedSource, n: usize) {
        for _ in 0..1000 {
            if source.calls() >= n {
                return;
            }
            tokio::task::yield_now().await;
        }
        panic!("expected {n} calls, saw {}", source.calls());
    }
}
