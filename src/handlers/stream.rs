//! Live decision stream (SSE)
//!
//! A new connection first replays the recent decision records buffered by the
//! bus, then receives live publishes. The keepalive comment covers idle gaps;
//! dropping the connection drops the subscription and frees the bus slot.

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures_util::stream::{self, Stream, StreamExt};
use std::time::Duration;

use crate::AppState;

pub async fn stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let mut subscription = state.bus.subscribe();
    let replay = std::mem::take(&mut subscription.replay);

    // The subscription travels inside the unfold state, so client disconnect
    // drops it and unsubscribes.
    let live = stream::unfold(subscription, |mut subscription| async move {
        subscription
            .receiver
            .recv()
            .await
            .map(|record| (record, subscription))
    });

    let events = stream::iter(replay)
        .chain(live)
        .map(|record| Event::default().event("decision").json_data(&record));

    Sse::new(events).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}
