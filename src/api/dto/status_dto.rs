//! Session status DTOs for `GET /admin/events/status`.

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::ws::Subscription;
use crate::ws::registry::RegistryEntry;

/// A session's subscription, with set members sorted for stable output.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SubscriptionDto {
    /// Subscribed collections.
    pub collections: Vec<String>,
    /// Event type filter; empty means all types.
    pub types: Vec<String>,
    /// Namespace filter; empty means all namespaces.
    pub namespaces: Vec<String>,
}

impl From<&Subscription> for SubscriptionDto {
    fn from(sub: &Subscription) -> Self {
        let mut collections: Vec<String> = sub.collections.iter().cloned().collect();
        collections.sort();
        let mut types: Vec<String> = sub
            .filter
            .types
            .iter()
            .map(|t| t.as_str().to_string())
            .collect();
        types.sort();
        let mut namespaces: Vec<String> = sub.filter.namespaces.iter().cloned().collect();
        namespaces.sort();
        Self {
            collections,
            types,
            namespaces,
        }
    }
}

/// One live WebSocket session.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SessionStatusDto {
    /// Session identifier.
    pub session_id: uuid::Uuid,
    /// When the transport was accepted.
    pub connected_at: DateTime<Utc>,
    /// Current subscription; `null` until a `start` command is applied.
    pub subscription: Option<SubscriptionDto>,
    /// Events dropped because the session's queue was full.
    pub dropped: u64,
}

impl From<&RegistryEntry> for SessionStatusDto {
    fn from(entry: &RegistryEntry) -> Self {
        Self {
            session_id: *entry.handle.id().as_uuid(),
            connected_at: entry.handle.connected_at(),
            subscription: entry.subscription.as_deref().map(SubscriptionDto::from),
            dropped: entry.handle.dropped_count(),
        }
    }
}

/// Response body for `GET /admin/events/status`.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct EventsStatusResponse {
    /// Number of live sessions.
    pub session_count: usize,
    /// Whether the manager has been cancelled.
    pub shutting_down: bool,
    /// Per-session details, oldest first.
    pub sessions: Vec<SessionStatusDto>,
}
