//! Server-Sent Events (SSE) stream of engine events.

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;

use routines_app::ports::{Capabilities, EventPublisher, StateStore};

use crate::state::AppState;

/// `GET /api/events/stream`: SSE stream of engine events.
///
/// Each engine event is sent as a JSON `data:` frame whose SSE event name is
/// the event type. The stream continues until the client disconnects.
pub async fn stream<S, C, P>(
    State(state): State<AppState<S, C, P>>,
) -> Sse<impl tokio_stream::Stream<Item = Result<Event, std::convert::Infallible>>>
where
    S: StateStore,
    C: Capabilities,
    P: EventPublisher + Send + Sync + 'static,
{
    let event_rx = state.event_bus.subscribe();
    let event_stream = BroadcastStream::new(event_rx).filter_map(|result| match result {
        Ok(event) => match Event::default()
            .event(event.event_type.to_string())
            .json_data(&event)
        {
            Ok(frame) => Some(Ok(frame)),
            Err(err) => {
                tracing::warn!(%err, "failed to serialize event for SSE stream");
                None
            }
        },
        Err(BroadcastStreamRecvError::Lagged(skipped)) => {
            tracing::warn!(skipped, "SSE subscriber lagged, some events were dropped");
            None
        }
    });

    Sse::new(event_stream).keep_alive(KeepAlive::default())
}
