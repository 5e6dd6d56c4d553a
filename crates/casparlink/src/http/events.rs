//! `GET /api/events`: Server-Sent Events push channel.
//!
//! Each subscriber gets its own bounded buffer in the broadcaster; a slow
//! client loses its oldest events rather than holding anyone else up, and
//! is told so by a `lagged` frame carrying its running drop count. The
//! first frame is a `hello` carrying the current health report.

use std::convert::Infallible;
use std::time::Duration;

use axum::extract::State;
use axum::response::sse::{Event as SseEvent, KeepAlive, Sse};
use casparlink_core::Event;
use futures_util::stream::{self, Stream, StreamExt};
use serde_json::json;
use tracing::{debug, info, warn};

use super::AppState;

const KEEP_ALIVE: Duration = Duration::from_secs(15);

pub async fn stream(State(state): State<AppState>) -> Sse<impl Stream<Item = Result<SseEvent, Infallible>>> {
    // Subscribe before building the hello frame so nothing published in
    // between is missed.
    let subscription = state.manager.subscribe();
    info!(subscribers = state.manager.health().subscribers, "event client connected");

    let hello = match serde_json::to_string(&state.manager.health()) {
        Ok(data) => SseEvent::default().event("hello").data(data),
        Err(e) => {
            warn!(error = %e, "cannot encode health report");
            SseEvent::default().event("hello")
        }
    };

    let events = stream::unfold(subscription, |mut sub| async move {
        let seen = sub.dropped();
        let event = sub.recv().await?;

        let mut frames = Vec::with_capacity(2);
        if sub.dropped() > seen {
            debug!(dropped = sub.dropped(), "event client lagged");
            frames.push(lagged(sub.dropped()));
        }
        frames.extend(encode(&event));
        Some((frames, sub))
    })
    .flat_map(|frames| stream::iter(frames.into_iter().map(Ok)));
    let frames = stream::once(std::future::ready(Ok(hello)))
        .chain(events)
        .take_until(state.shutdown.cancelled_owned());

    Sse::new(frames).keep_alive(KeepAlive::new().interval(KEEP_ALIVE).text("ping"))
}

fn lagged(dropped: u64) -> SseEvent {
    SseEvent::default()
        .event("lagged")
        .data(json!({ "dropped": dropped }).to_string())
}

fn encode(event: &Event) -> Option<SseEvent> {
    match serde_json::to_string(event) {
        Ok(data) => Some(SseEvent::default().event(event.name()).data(data)),
        Err(e) => {
            warn!(event = event.name(), error = %e, "dropping unencodable event");
            None
        }
    }
}
