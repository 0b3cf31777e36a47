//! Service error types with HTTP status code mapping.
//!
//! [`EventsError`] is the central error type. Only upgrade failures ever
//! reach an HTTP client; everything that goes wrong inside a live session
//! is contained to that session and logged.

use axum::extract::ws::rejection::WebSocketUpgradeRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// Structured JSON error response body.
///
/// ```json
/// {
///   "error": {
///     "code": 1001,
///     "message": "websocket upgrade rejected: ..."
///   }
/// }
/// ```
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Numeric error code.
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Server-side error enum with HTTP status code mapping.
///
/// # Error Code Ranges
///
/// | Range     | Category   | HTTP Status                   |
/// |-----------|------------|-------------------------------|
/// | 1000–1999 | Request    | 4xx from the upgrade check    |
/// | 2000–2999 | Lifecycle  | 503 Service Unavailable       |
/// | 3000–3999 | Server     | 500 Internal Server Error     |
#[derive(Debug, thiserror::Error)]
pub enum EventsError {
    /// The request is not a valid WebSocket upgrade.
    #[error("websocket upgrade rejected: {message}")]
    UpgradeRejected {
        /// Client-error status chosen by the upgrade check.
        status: StatusCode,
        /// Why the upgrade was refused.
        message: String,
    },

    /// The manager has been cancelled and accepts no new sessions.
    #[error("change event manager is shutting down")]
    ShuttingDown,

    /// A configuration value could not be parsed.
    #[error("invalid configuration {key}: {message}")]
    InvalidConfig {
        /// Environment variable name.
        key: &'static str,
        /// Parse failure description.
        message: String,
    },
}

impl EventsError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::UpgradeRejected { .. } => 1001,
            Self::ShuttingDown => 2001,
            Self::InvalidConfig { .. } => 3001,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::UpgradeRejected { status, .. } => *status,
            Self::ShuttingDown => StatusCode::SERVICE_UNAVAILABLE,
            Self::InvalidConfig { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<WebSocketUpgradeRejection> for EventsError {
    fn from(rejection: WebSocketUpgradeRejection) -> Self {
        let status = rejection.status();
        // Upgrade checks only ever reject with a client error.
        let status = if status.is_client_error() {
            status
        } else {
            StatusCode::BAD_REQUEST
        };
        Self::UpgradeRejected {
            status,
            message: rejection.body_text(),
        }
    }
}

impl IntoResponse for EventsError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.to_string(),
                details: None,
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}
