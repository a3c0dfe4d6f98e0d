//! Server-Sent Events stream of state records.

use crate::api::AppState;
use crate::state::StateRecord;
use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    routing::get,
    Router,
};
use std::convert::Infallible;
use std::sync::Arc;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::{Stream, StreamExt};
use tracing::{debug, warn};

/// Create SSE router
pub fn create_sse_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/sse", get(stream))
        .with_state(state)
}

/// GET /sse - current snapshot followed by live records.
///
/// Each record is sent as a JSON `data:` frame in Home Assistant's state
/// object format.
async fn stream(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let state_rx = state.broadcaster.subscribe();
    let snapshot = state.store.list();
    debug!(states = snapshot.len(), "SSE subscriber connected, replaying states");

    let live = BroadcastStream::new(state_rx).filter_map(|result| match result {
        Ok(record) => Some(record),
        Err(BroadcastStreamRecvError::Lagged(skipped)) => {
            warn!(skipped = skipped, "SSE subscriber lagged, skipped states");
            None
        }
    });

    let events = tokio_stream::iter(snapshot)
        .chain(live)
        .filter_map(|record| to_event(&record).map(Ok));

    Sse::new(events).keep_alive(KeepAlive::default())
}

fn to_event(record: &StateRecord) -> Option<Event> {
    match serde_json::to_string(record) {
        Ok(json) => Some(Event::default().data(json)),
        Err(e) => {
            warn!(entity_id = %record.entity_id, error = %e, "Failed to serialize state for SSE");
            None
        }
    }
}
