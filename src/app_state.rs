//! Shared application state injected into all Axum handlers.

use crate::ws::AdminEventManager;

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Change-event manager backing the WebSocket endpoint.
    pub events: AdminEventManager,
}
