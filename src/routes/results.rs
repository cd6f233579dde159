use std::convert::Infallible;

use axum::extract::{Path, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::{self, Stream, StreamExt};
use serde::Serialize;
use tokio_stream::wrappers::WatchStream;
use tracing::{debug, warn};

use crate::app_state::AppState;
use crate::models::record::RecordId;
use crate::poller::{Screen, ScreenOptions, ViewModel};

#[derive(Serialize)]
struct ResultUpdate<'a> {
    view: &'a ViewModel,
    screen: Screen,
}

/// GET /api/results/{record_id} — server-sent stream of result updates.
///
/// Each `result` event carries the view model and the screen it resolves to.
/// A final `end` event follows once polling stops. Disconnecting cancels the poll.
pub async fn stream_results(
    State(state): State<AppState>,
    Path(record_id): Path<String>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let handle = state.poller.start(RecordId::from(record_id));
    debug!(record_id = %handle.record_id(), "Result stream opened");
    let options = state.screen.clone();

    let updates = WatchStream::new(handle.subscribe()).map(move |view| {
        // The stream owns the poll; dropping it cancels the poll.
        let _poll = &handle;
        Ok::<_, Infallible>(result_event(&view, &options))
    });
    let end = stream::once(async { Ok::<_, Infallible>(Event::default().event("end").data("done")) });

    Sse::new(updates.chain(end)).keep_alive(KeepAlive::default())
}

fn result_event(view: &ViewModel, options: &ScreenOptions) -> Event {
    let update = ResultUpdate {
        view,
        screen: view.screen(options),
    };
    Event::default()
        .event("result")
        .json_data(&update)
        .unwrap_or_else(|e| {
            warn!(record_id = %view.record_id, error = %e, "Failed to encode result event");
            Event::default().event("result_error").data("encoding failed")
        })
}
