//! REST API layer: route handlers, DTOs, OpenAPI document, and router
//! composition.

pub mod dto;
pub mod handlers;

use axum::Router;
use utoipa::OpenApi;

use crate::app_state::AppState;
use crate::ws;

/// OpenAPI document for the REST endpoints.
#[derive(Debug, OpenApi)]
#[openapi(
    paths(handlers::system::health_handler, handlers::events::status_handler),
    components(schemas(
        handlers::system::HealthResponse,
        dto::EventsStatusResponse,
        dto::SessionStatusDto,
        dto::SubscriptionDto,
    )),
    tags(
        (name = "System", description = "Service health"),
        (name = "Events", description = "Change-event WebSocket sessions"),
    )
)]
pub struct ApiDoc;

/// Builds the complete router: REST endpoints plus the WebSocket upgrade
/// endpoint at `ws_path`.
pub fn build_router(ws_path: &str) -> Router<AppState> {
    let router = Router::new()
        .merge(handlers::system::routes())
        .merge(handlers::events::routes())
        .merge(ws::handler::routes(ws_path));

    #[cfg(feature = "swagger-ui")]
    let router = router.merge(
        utoipa_swagger_ui::SwaggerUi::new("/swagger-ui")
            .url("/api-docs/openapi.json", ApiDoc::openapi()),
    );

    router
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_lists_rest_paths() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/health"));
        assert!(doc.paths.paths.contains_key("/admin/events/status"));
    }
}
