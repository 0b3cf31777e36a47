//! admin-events server entry point.
//!
//! Starts the Axum HTTP server with the change-event WebSocket endpoint and
//! drains sessions on `Ctrl-C`.

use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use admin_events::api;
use admin_events::app_state::AppState;
use admin_events::config::EventsConfig;
use admin_events::ws::AdminEventManager;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = EventsConfig::from_env()?;

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if config.json_logs {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
    tracing::info!(addr = %config.listen_addr, ws_path = %config.ws_path, "starting admin-events");

    let shutdown = CancellationToken::new();
    let events = AdminEventManager::new(config.queue_length, shutdown.child_token());

    let app = api::build_router(&config.ws_path)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(AppState {
            events: events.clone(),
        });

    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    let signal = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("shutdown signal received");
                signal.cancel();
            }
            Err(err) => tracing::error!(error = %err, "failed to listen for shutdown signal"),
        }
    });

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await?;

    // The server has stopped accepting; wait for open sessions to close.
    if tokio::time::timeout(config.shutdown_timeout, events.wait_stop())
        .await
        .is_err()
    {
        tracing::warn!(
            timeout_secs = config.shutdown_timeout.as_secs(),
            remaining = events.session_count(),
            "shutdown timed out before all ws sessions closed"
        );
    }
    tracing::info!("admin-events stopped");

    Ok(())
}
