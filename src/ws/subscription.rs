//! Per-connection subscription and the event matching predicate.
//!
//! A session holds at most one [`Subscription`]. Matching is a pure
//! function of the event and the subscription in effect when the event is
//! dispatched.

use std::collections::HashSet;

use crate::domain::{ChangeEvent, ChangeEventFilter};

/// Interest description installed by a `start` command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Subscription {
    /// Collections of interest. Exact string membership; empty matches nothing.
    pub collections: HashSet<String>,
    /// Type and namespace narrowing.
    pub filter: ChangeEventFilter,
}

impl Subscription {
    /// Builds a subscription from the collections listed in a command.
    #[must_use]
    pub fn new(collections: impl IntoIterator<Item = String>, filter: ChangeEventFilter) -> Self {
        Self {
            collections: collections.into_iter().collect(),
            filter,
        }
    }

    /// Returns `true` if the event belongs to a subscribed collection and
    /// passes the filter.
    #[must_use]
    pub fn matches(&self, event: &ChangeEvent) -> bool {
        self.collections.contains(&event.collection) && self.filter.accepts(event)
    }
}

/// Decides whether `event` should be delivered to a session whose current
/// subscription is `subscription`.
///
/// A session without a subscription receives nothing.
#[must_use]
pub fn matches(event: &ChangeEvent, subscription: Option<&Subscription>) -> bool {
    subscription.is_some_and(|sub| sub.matches(event))
}
