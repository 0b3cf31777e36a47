//! Inbound command frames sent by WebSocket clients.
//!
//! ```json
//! { "type": "start",
//!   "collections": ["messages"],
//!   "filter": { "types": ["created"], "namespaces": ["ns1"] } }
//! ```
//!
//! Decoding is lenient: missing or `null` fields default to empty and
//! unrecognized event type names are kept as a value that matches nothing.
//! Only a frame that is not a JSON command object at all is dropped by the
//! caller.

use serde::Deserialize;

use super::subscription::Subscription;
use crate::domain::ChangeEventFilter;
use crate::domain::change_event::null_as_default;

/// Discriminator for command frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeEventCommandType {
    /// Install (or replace) the connection's subscription.
    Start,
    /// Clear the connection's subscription.
    Stop,
    /// Any other `type` value; ignored.
    #[serde(other)]
    Unknown,
}

/// A decoded command frame.
#[derive(Debug, Clone, Deserialize)]
pub struct ChangeEventCommand {
    /// Command discriminator. Required.
    #[serde(rename = "type")]
    pub command_type: ChangeEventCommandType,
    /// Collections to subscribe to. Ignored for `stop`.
    #[serde(default, deserialize_with = "null_as_default")]
    pub collections: Vec<String>,
    /// Type and namespace filter. Ignored for `stop`.
    #[serde(default, deserialize_with = "null_as_default")]
    pub filter: ChangeEventFilter,
}

/// Effect a decoded frame has on the session's subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscriptionChange {
    /// Replace the subscription with this one.
    Replace(Subscription),
    /// Drop the subscription.
    Clear,
}

/// Reasons a frame is discarded.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    /// The frame is not a JSON command object.
    #[error("malformed command frame: {0}")]
    Malformed(#[from] serde_json::Error),
    /// The frame decoded but names a command this server does not know.
    #[error("unknown command type")]
    UnknownType,
}

impl ChangeEventCommand {
    /// Converts the command into the subscription change it requests.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::UnknownType`] for unrecognized command types.
    pub fn into_change(self) -> Result<SubscriptionChange, CommandError> {
        match self.command_type {
            ChangeEventCommandType::Start => Ok(SubscriptionChange::Replace(Subscription::new(
                self.collections,
                self.filter,
            ))),
            ChangeEventCommandType::Stop => Ok(SubscriptionChange::Clear),
            ChangeEventCommandType::Unknown => Err(CommandError::UnknownType),
        }
    }
}

/// Decodes a text frame into the subscription change it requests.
///
/// # Errors
///
/// Returns a [`CommandError`] if the frame is not a recognized command.
pub fn parse_command(text: &str) -> Result<SubscriptionChange, CommandError> {
    serde_json::from_str::<ChangeEventCommand>(text)?.into_change()
}
