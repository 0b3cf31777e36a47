//! Change-event manager introspection.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};

use crate::api::dto::{EventsStatusResponse, SessionStatusDto};
use crate::app_state::AppState;

/// `GET /admin/events/status`: live sessions and their subscriptions.
#[utoipa::path(
    get,
    path = "/admin/events/status",
    tag = "Events",
    summary = "Change-event session status",
    description = "Lists every live WebSocket session with its current subscription and dropped-event count.",
    responses(
        (status = 200, description = "Session snapshot", body = EventsStatusResponse),
    )
)]
pub async fn status_handler(State(state): State<AppState>) -> Json<EventsStatusResponse> {
    let mut sessions: Vec<SessionStatusDto> = state
        .events
        .registry()
        .snapshot()
        .iter()
        .map(SessionStatusDto::from)
        .collect();
    sessions.sort_by_key(|s| s.connected_at);

    Json(EventsStatusResponse {
        session_count: sessions.len(),
        shutting_down: state.events.is_cancelled(),
        sessions,
    })
}

/// Event introspection routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/admin/events/status", get(status_handler))
}
