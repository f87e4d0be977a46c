use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use std::convert::Infallible;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;

use preingest_core::PreingestEvent;

use crate::state::AppState;

/// GET /api/events — SSE stream with one event per lifecycle notification.
///
/// The event name is the lowercase phase (`started`, `executing`,
/// `completed`, `failed`); the data is the notification as JSON. Slow
/// clients that fall behind the channel skip the missed notifications.
pub async fn sse_events(State(app): State<AppState>) -> impl axum::response::IntoResponse {
    let rx = app.notifier.stream();
    let stream = BroadcastStream::new(rx).filter_map(|msg| match msg {
        Ok(event) => to_sse(&event).map(Ok::<Event, Infallible>),
        Err(e) => {
            tracing::warn!(error = %e, "event stream client lagged");
            None
        }
    });
    Sse::new(stream).keep_alive(KeepAlive::default())
}

fn to_sse(event: &PreingestEvent) -> Option<Event> {
    match serde_json::to_string(event) {
        Ok(data) => Some(
            Event::default()
                .event(event.action_type.as_str().to_ascii_lowercase())
                .data(data),
        ),
        Err(e) => {
            tracing::error!(process_id = %event.process_id(), error = %e, "failed to encode event");
            None
        }
    }
}
