//! Registry of live WebSocket sessions and their current subscriptions.
//!
//! [`SubscriptionRegistry`] is the only state shared between session tasks
//! and the dispatch path. Each session owns one [`SessionHandle`]; the
//! session task is the single writer of its handle's subscription, while
//! [`SubscriptionRegistry::snapshot`] copies out `Arc`s for any number of
//! concurrent readers.
//!
//! # Consistency
//!
//! A snapshot is a point-in-time-ish copy. A subscription change made while
//! a snapshot is being taken may or may not be visible to it, but it is
//! visible to every snapshot taken afterwards. Dispatch accepts that
//! staleness so it never waits on a session.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use super::subscription::Subscription;
use crate::domain::SessionId;

/// Serialized event frame shared between every session it is delivered to.
pub type Frame = Arc<str>;

/// Registry-side view of one session: identity, current subscription and
/// the sending half of its outbound queue.
#[derive(Debug)]
pub struct SessionHandle {
    id: SessionId,
    connected_at: DateTime<Utc>,
    outbound: mpsc::Sender<Frame>,
    subscription: RwLock<Option<Arc<Subscription>>>,
    dropped: AtomicU64,
}

impl SessionHandle {
    fn new(outbound: mpsc::Sender<Frame>) -> Self {
        Self {
            id: SessionId::new(),
            connected_at: Utc::now(),
            outbound,
            subscription: RwLock::new(None),
            dropped: AtomicU64::new(0),
        }
    }

    /// Returns the session identifier.
    #[must_use]
    pub const fn id(&self) -> SessionId {
        self.id
    }

    /// Returns when the transport was accepted.
    #[must_use]
    pub const fn connected_at(&self) -> DateTime<Utc> {
        self.connected_at
    }

    /// Returns the subscription currently in effect, if any.
    #[must_use]
    pub fn subscription(&self) -> Option<Arc<Subscription>> {
        self.subscription.read().clone()
    }

    /// Number of events dropped for this session because its queue was
    /// full or already closed.
    #[must_use]
    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    fn set_subscription(&self, subscription: Option<Subscription>) {
        *self.subscription.write() = subscription.map(Arc::new);
    }

    /// Enqueues a frame on the outbound queue without waiting.
    ///
    /// Returns `false` when the frame was dropped.
    pub fn try_deliver(&self, frame: &Frame) -> bool {
        match self.outbound.try_send(Arc::clone(frame)) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                if dropped == 1 {
                    tracing::warn!(session_id = %self.id, "outbound queue full, dropping events");
                } else {
                    tracing::debug!(session_id = %self.id, dropped, "event dropped");
                }
                false
            }
            Err(TrySendError::Closed(_)) => {
                let _ = self.dropped.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(session_id = %self.id, "event dropped for closing session");
                false
            }
        }
    }
}

/// Point-in-time copy of one registry entry.
#[derive(Debug, Clone)]
pub struct RegistryEntry {
    /// The session the entry belongs to.
    pub handle: Arc<SessionHandle>,
    /// The subscription that was in effect when the snapshot was taken.
    pub subscription: Option<Arc<Subscription>>,
}

/// Concurrent set of live sessions.
#[derive(Debug)]
pub struct SubscriptionRegistry {
    sessions: RwLock<HashMap<SessionId, Arc<SessionHandle>>>,
    queue_capacity: usize,
}

impl SubscriptionRegistry {
    /// Creates an empty registry whose sessions get outbound queues of
    /// `queue_capacity` frames (at least one).
    #[must_use]
    pub fn new(queue_capacity: usize) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            queue_capacity: queue_capacity.max(1),
        }
    }

    /// Registers a new session with no subscription.
    ///
    /// Returns the handle and the receiving half of its outbound queue,
    /// which the session task owns.
    pub fn add(&self) -> (Arc<SessionHandle>, mpsc::Receiver<Frame>) {
        let (tx, rx) = mpsc::channel(self.queue_capacity);
        let handle = Arc::new(SessionHandle::new(tx));
        let _ = self
            .sessions
            .write()
            .insert(handle.id(), Arc::clone(&handle));
        (handle, rx)
    }

    /// Removes a session. Returns `false` if it was already gone.
    pub fn remove(&self, id: SessionId) -> bool {
        self.sessions.write().remove(&id).is_some()
    }

    /// Replaces (or clears) the subscription of one session.
    ///
    /// Visible to every snapshot taken after this returns.
    pub fn update_subscription(&self, handle: &SessionHandle, subscription: Option<Subscription>) {
        handle.set_subscription(subscription);
    }

    /// Copies out every live session with its current subscription.
    ///
    /// Holds the registry read lock only while cloning `Arc`s.
    #[must_use]
    pub fn snapshot(&self) -> Vec<RegistryEntry> {
        let sessions = self.sessions.read();
        sessions
            .values()
            .map(|handle| RegistryEntry {
                handle: Arc::clone(handle),
                subscription: handle.subscription(),
            })
            .collect()
    }

    /// Returns the number of live sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    /// Returns `true` if no session is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }
}
