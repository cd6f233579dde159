use std::sync::Arc;

use crate::poller::{PollSchedule, Poller, ScreenOptions};
use crate::services::records::RecordsClient;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub records: Arc<RecordsClient>,
    pub poller: Poller<RecordsClient>,
    pub screen: Arc<ScreenOptions>,
}

impl AppState {
    pub fn new(records: RecordsClient, schedule: PollSchedule, screen: ScreenOptions) -> Self {
        let records = Arc::new(records);
        Self {
            poller: Poller::new(Arc::clone(&records), schedule),
            records,
            screen: Arc::new(screen),
        }
    }
}
