//! Domain layer: change events, subscription filters, and session identity.
//!
//! These types are shared by the WebSocket layer (which matches and
//! delivers events) and by the producers that construct events after a
//! stored record changes.

pub mod change_event;
pub mod session_id;

pub use change_event::{ChangeEvent, ChangeEventFilter, ChangeEventType};
pub use session_id::SessionId;
