//! Change events emitted when a stored record is created, updated or deleted.
//!
//! A [`ChangeEvent`] is built by whichever component mutated the record and
//! handed to [`crate::ws::AdminEventManager::dispatch`]. Its JSON encoding is
//! exactly what WebSocket subscribers receive, one event per frame.

use std::collections::HashSet;

use serde::{Deserialize, Deserializer, Serialize};

/// Kind of mutation a change event describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeEventType {
    /// A record was inserted.
    Created,
    /// An existing record was modified.
    Updated,
    /// A record was removed.
    Deleted,
    /// A type name this build does not recognize. Only appears in decoded
    /// filters, where it matches no event.
    #[serde(other)]
    Unknown,
}

impl ChangeEventType {
    /// Returns the wire name of the event type.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Deleted => "deleted",
            Self::Unknown => "unknown",
        }
    }
}

/// Notification that a record in `collection` within `namespace` changed.
///
/// Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    /// Storage collection the record lives in (e.g. `"messages"`).
    pub collection: String,
    /// What happened to the record.
    #[serde(rename = "type")]
    pub event_type: ChangeEventType,
    /// Namespace owning the record.
    pub namespace: String,
    /// Identifier of the changed record, when it has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<uuid::Uuid>,
}

impl ChangeEvent {
    /// Creates an event without a record identifier.
    #[must_use]
    pub fn new(
        collection: impl Into<String>,
        event_type: ChangeEventType,
        namespace: impl Into<String>,
    ) -> Self {
        Self {
            collection: collection.into(),
            event_type,
            namespace: namespace.into(),
            id: None,
        }
    }

    /// Attaches the identifier of the changed record.
    #[must_use]
    pub fn with_id(mut self, id: uuid::Uuid) -> Self {
        self.id = Some(id);
        self
    }
}

/// Narrows a subscription by event type and namespace.
///
/// An empty set in either field is a wildcard for that dimension. Missing
/// or `null` fields on the wire decode to empty sets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEventFilter {
    /// Event types of interest; empty means all types.
    #[serde(default, deserialize_with = "null_as_default")]
    pub types: HashSet<ChangeEventType>,
    /// Namespaces of interest; empty means all namespaces.
    #[serde(default, deserialize_with = "null_as_default")]
    pub namespaces: HashSet<String>,
}

impl ChangeEventFilter {
    /// Returns `true` if the event's type and namespace pass this filter.
    #[must_use]
    pub fn accepts(&self, event: &ChangeEvent) -> bool {
        let type_ok = self.types.is_empty()
            || (event.event_type != ChangeEventType::Unknown
                && self.types.contains(&event.event_type));
        type_ok
            && (self.namespaces.is_empty() || self.namespaces.contains(&event.namespace))
    }
}

/// Decodes an explicit JSON `null` the same way as a missing field.
///
/// # Errors
///
/// Returns the deserializer's error when the value is neither `null` nor a
/// valid `T`.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
