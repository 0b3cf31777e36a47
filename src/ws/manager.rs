//! Change-event manager: session lifecycle, dispatch, and shutdown.
//!
//! [`AdminEventManager`] ties together the [`SubscriptionRegistry`], the
//! per-connection session tasks, and a manager-wide [`CancellationToken`].
//!
//! ```text
//! producer ── dispatch(event) ──► registry snapshot ──► matches? ──► try_send
//!                                                                   │
//! ws upgrade ── accept ──► registry.add ──► run_session ◄── outbound queue
//! ```
//!
//! Dispatch never awaits. A session whose queue is full or closing simply
//! misses the event.

use std::sync::Arc;

use axum::extract::ws::WebSocketUpgrade;
use axum::response::Response;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use super::connection::run_session;
use super::registry::{Frame, SessionHandle, SubscriptionRegistry};
use super::subscription::matches;
use crate::domain::ChangeEvent;
use crate::error::EventsError;

#[derive(Debug)]
struct Inner {
    registry: Arc<SubscriptionRegistry>,
    cancel: CancellationToken,
    sessions: TaskTracker,
}

/// Fans change events out to subscribed WebSocket sessions.
///
/// Cheap to clone; all clones share the same registry and cancellation
/// scope.
#[derive(Debug, Clone)]
pub struct AdminEventManager {
    inner: Arc<Inner>,
}

impl AdminEventManager {
    /// Creates a manager bound to `cancel`.
    ///
    /// Each session gets an outbound queue of `queue_capacity` frames.
    /// Cancelling `cancel` (or calling [`Self::cancel`]) closes every
    /// session and refuses new ones.
    #[must_use]
    pub fn new(queue_capacity: usize, cancel: CancellationToken) -> Self {
        Self {
            inner: Arc::new(Inner {
                registry: Arc::new(SubscriptionRegistry::new(queue_capacity)),
                cancel,
                sessions: TaskTracker::new(),
            }),
        }
    }

    /// Returns the registry of live sessions.
    #[must_use]
    pub fn registry(&self) -> &Arc<SubscriptionRegistry> {
        &self.inner.registry
    }

    /// Signals every session to close. Irreversible.
    pub fn cancel(&self) {
        self.inner.cancel.cancel();
    }

    /// Returns `true` once cancellation has been signaled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancel.is_cancelled()
    }

    /// Number of sessions currently registered.
    #[must_use]
    pub fn session_count(&self) -> usize {
        self.inner.registry.len()
    }

    /// Publishes `event` to every session whose subscription matches it.
    ///
    /// Fire-and-forget: never blocks, never fails. After cancellation this
    /// does nothing.
    pub fn dispatch(&self, event: &ChangeEvent) {
        let _ = self.dispatch_counted(event);
    }

    /// Same as [`Self::dispatch`] but returns how many sessions the event
    /// was enqueued to.
    pub fn dispatch_counted(&self, event: &ChangeEvent) -> usize {
        if self.is_cancelled() {
            return 0;
        }

        let targets: Vec<Arc<SessionHandle>> = self
            .inner
            .registry
            .snapshot()
            .into_iter()
            .filter(|entry| matches(event, entry.subscription.as_deref()))
            .map(|entry| entry.handle)
            .collect();
        if targets.is_empty() {
            return 0;
        }

        let frame: Frame = match serde_json::to_string(event) {
            Ok(json) => Frame::from(json),
            Err(err) => {
                tracing::warn!(collection = %event.collection, error = %err, "failed to serialize change event");
                return 0;
            }
        };

        let delivered = targets
            .iter()
            .filter(|handle| handle.try_deliver(&frame))
            .count();
        tracing::debug!(
            collection = %event.collection,
            event_type = event.event_type.as_str(),
            namespace = %event.namespace,
            matched = targets.len(),
            delivered,
            "change event dispatched"
        );
        delivered
    }

    /// Completes a WebSocket upgrade and starts a session for it.
    ///
    /// The session is tracked from this call until its task exits, so
    /// [`Self::wait_stop`] also waits for upgrades still in flight.
    ///
    /// # Errors
    ///
    /// Returns [`EventsError::ShuttingDown`] once the manager is cancelled.
    pub fn accept(&self, upgrade: WebSocketUpgrade) -> Result<Response, EventsError> {
        if self.is_cancelled() {
            return Err(EventsError::ShuttingDown);
        }

        let guard = self.inner.sessions.token();
        let registry = Arc::clone(&self.inner.registry);
        let cancel = self.inner.cancel.clone();

        Ok(upgrade
            .on_failed_upgrade(|err: axum::Error| tracing::debug!(error = %err, "ws upgrade failed"))
            .on_upgrade(move |socket| async move {
                let _guard = guard;
                if cancel.is_cancelled() {
                    return;
                }
                let (handle, outbound) = registry.add();
                run_session(socket, handle, outbound, registry, cancel).await;
            }))
    }

    /// Waits until every session task has exited.
    ///
    /// Only returns promptly after cancellation; before that, live sessions
    /// keep it waiting.
    pub async fn wait_stop(&self) {
        self.inner.sessions.close();
        self.inner.sessions.wait().await;
        tracing::debug!("all ws sessions drained");
    }
}
