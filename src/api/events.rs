use axum::{
    Router,
    extract::{Query, State},
    response::sse::{Event, KeepAlive, Sse},
    routing::get,
};
use futures::stream::{self, Stream};
use serde::Deserialize;
use std::{convert::Infallible, sync::Arc, time::Duration};
use tokio::sync::broadcast;
use tracing::warn;

use super::ApiError;
use super::validation::validate_user_id;
use crate::api::AppState;
use crate::domain::UserId;
use crate::domain::events::NotificationEvent;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/events", get(sse_handler))
}

#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    pub user_id: Option<i64>,
}

fn event_frame(event: &NotificationEvent) -> Event {
    let json = serde_json::to_string(event).unwrap_or_default();
    Event::default().event(event.kind()).data(json)
}

/// `GET /api/events[?user_id=N]`
///
/// Streams side-channel notices. A per-user adapter passes `user_id` and only
/// sees that user's events; without it every event is delivered.
async fn sse_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<EventsQuery>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let only: Option<UserId> = query.user_id.map(validate_user_id).transpose()?;
    let rx = state.event_bus().subscribe();

    let stream = stream::unfold(rx, move |mut rx| async move {
        loop {
            match rx.recv().await {
                Ok(event) => {
                    if only.is_some_and(|id| event.user_id() != id) {
                        continue;
                    }
                    return Some((Ok(event_frame(&event)), rx));
                }
                Err(broadcast::error::RecvError::Lagged(count)) => {
                    warn!("Client lagged by {} messages", count);
                    return Some((
                        Ok(Event::default().event("warning").data("Missed some events")),
                        rx,
                    ));
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15))))
}

