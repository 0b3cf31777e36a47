//! WebSocket layer: change-event sessions, subscriptions, and fan-out.
//!
//! Clients connect to the upgrade endpoint, send `start`/`stop` commands
//! describing the collections, event types and namespaces they care about,
//! and receive every matching [`crate::domain::ChangeEvent`] dispatched
//! afterwards.

pub mod connection;
pub mod handler;
pub mod manager;
pub mod messages;
pub mod registry;
pub mod subscription;

pub use manager::AdminEventManager;
pub use registry::SubscriptionRegistry;
pub use subscription::Subscription;
