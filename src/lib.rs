//! # admin-events
//!
//! Real-time change-event distribution for the multi-party orchestration
//! API.
//!
//! Components that mutate stored records (broadcast, private messaging,
//! data exchange) describe each change as a [`domain::ChangeEvent`] and hand
//! it to [`ws::AdminEventManager::dispatch`]. WebSocket clients connect to
//! the upgrade endpoint, declare which collections, event types and
//! namespaces they care about, and receive every matching event.
//!
//! ## Architecture
//!
//! ```text
//! Producers                     Clients (WebSocket)
//!     │                               │
//!     │ dispatch(event)               ├── WS Handler (ws/handler)
//!     ▼                               │
//! AdminEventManager (ws/manager) ─────┤ accept → run_session (ws/connection)
//!     │                               │
//!     ├── SubscriptionRegistry (ws/registry)
//!     └── matches() (ws/subscription)
//!
//! REST: /health, /admin/events/status (api/)
//! ```

pub mod api;
pub mod app_state;
pub mod config;
pub mod domain;
pub mod error;
pub mod ws;
