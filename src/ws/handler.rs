//! Axum WebSocket upgrade handler.

use axum::Router;
use axum::extract::State;
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::ws::rejection::WebSocketUpgradeRejection;
use axum::response::Response;
use axum::routing::any;

use crate::app_state::AppState;
use crate::error::EventsError;

/// `GET <ws path>`: upgrade to a change-event WebSocket session.
///
/// # Errors
///
/// Returns [`EventsError::UpgradeRejected`] for requests that are not a
/// valid WebSocket upgrade and [`EventsError::ShuttingDown`] once the
/// manager has been cancelled.
pub async fn ws_handler(
    State(state): State<AppState>,
    upgrade: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Result<Response, EventsError> {
    let upgrade = upgrade.map_err(|rejection| {
        tracing::debug!(status = %rejection.status(), "rejecting non-upgrade request");
        EventsError::from(rejection)
    })?;
    state.events.accept(upgrade)
}

/// Mounts the upgrade endpoint at `path` for every method, so non-upgrade
/// requests get a structured rejection instead of a bare 405.
pub fn routes(path: &str) -> Router<AppState> {
    Router::new().route(path, any(ws_handler))
}
