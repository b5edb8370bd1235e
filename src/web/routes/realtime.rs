use std::convert::Infallible;

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::{self, Stream};

use crate::services::realtime_service::REFRESH_EVENT;
use crate::state::AppState;

/// One `REFRESH_ISSUES` event per cache reload. Clients re-pull
/// `/api/issues` on receipt; the event carries only the cache version.
pub async fn realtime_handler(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let updates = state.cache.subscribe();

    let events = stream::unfold(updates, |mut updates| async move {
        updates.changed().await.ok()?;
        let version = *updates.borrow_and_update();
        let event = Event::default()
            .event(REFRESH_EVENT)
            .data(version.to_string());
        Some((Ok(event), updates))
    });

    Sse::new(events).keep_alive(KeepAlive::default())
}
