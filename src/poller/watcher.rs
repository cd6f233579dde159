use tokio::sync::watch;
use tracing::debug;

use crate::models::record::RecordId;
use crate::poller::{PollHandle, PollOutcome, Poller, RecordSource, ViewModel};

/// Tracks the result of whichever record is currently selected.
///
/// Selecting a different record tears down the previous poll before the new
/// one starts, so results for the old id can never reach the new view.
pub struct ResultWatcher<S> {
    poller: Poller<S>,
    current: Option<PollHandle>,
}

impl<S: RecordSource> ResultWatcher<S> {
    pub fn new(poller: Poller<S>) -> Self {
        Self {
            poller,
            current: None,
        }
    }

    /// Show `record_id`, restarting polling from scratch if it changed.
    pub fn select(&mut self, record_id: RecordId) -> watch::Receiver<ViewModel> {
        if let Some(handle) = &self.current {
            if handle.record_id() == &record_id {
                return handle.subscribe();
            }
            debug!(previous = %handle.record_id(), next = %record_id, "Switching watched record");
        }

        // Drop the old handle first so its poll is cancelled before the new one runs.
        self.current = None;
        let handle = self.poller.start(record_id);
        let view = handle.subscribe();
        self.current = Some(handle);
        view
    }

    pub fn clear(&mut self) {
        self.current = None;
    }

    /// Wait for the current poll to stop and release it.
    pub async fn finish(&mut self) -> Option<PollOutcome> {
        let handle = self.current.take()?;
        Some(handle.finished().await)
    }

    pub fn current(&self) -> Option<&PollHandle> {
        self.current.as_ref()
    }

    pub fn view(&self) -> Option<ViewModel> {
        self.current.as_ref().map(PollHandle::view)
    }
}
