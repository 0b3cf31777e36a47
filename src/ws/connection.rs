//! WebSocket session loop.
//!
//! One task per accepted connection. The loop waits on three sources at
//! once: the manager's cancellation token, the next inbound frame, and the
//! next outbound event frame queued by the dispatcher. Whichever ends the
//! loop, the session deregisters itself exactly once on the way out.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{Sink, SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::messages::{SubscriptionChange, parse_command};
use super::registry::{Frame, SessionHandle, SubscriptionRegistry};

/// Upper bound on sending the close frame and flushing the transport.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

/// Why a session left its loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CloseReason {
    Cancelled,
    PeerClosed,
    ReadFailed,
    WriteFailed,
}

impl CloseReason {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Cancelled => "cancelled",
            Self::PeerClosed => "peer_closed",
            Self::ReadFailed => "read_failed",
            Self::WriteFailed => "write_failed",
        }
    }
}

/// Runs one session until cancellation, peer close, or a transport error.
///
/// `handle` must already be registered in `registry`; it is removed before
/// this returns.
pub async fn run_session(
    socket: WebSocket,
    handle: Arc<SessionHandle>,
    mut outbound: mpsc::Receiver<Frame>,
    registry: Arc<SubscriptionRegistry>,
    cancel: CancellationToken,
) {
    let session_id = handle.id();
    let (mut ws_tx, mut ws_rx) = socket.split();
    tracing::debug!(%session_id, "ws session started");

    let reason = loop {
        tokio::select! {
            biased;

            () = cancel.cancelled() => break CloseReason::Cancelled,

            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        handle_text_message(text.as_str(), &handle, &registry);
                    }
                    Some(Ok(Message::Close(_))) | None => break CloseReason::PeerClosed,
                    Some(Err(err)) => {
                        tracing::debug!(%session_id, error = %err, "ws read failed");
                        break CloseReason::ReadFailed;
                    }
                    // Ping/pong are answered by the transport.
                    Some(Ok(_)) => {}
                }
            }

            frame = outbound.recv() => {
                let Some(frame) = frame else {
                    break CloseReason::Cancelled;
                };
                // A stalled peer must not hold the session past cancellation.
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => break CloseReason::Cancelled,
                    sent = ws_tx.send(Message::text(&*frame)) => {
                        if let Err(err) = sent {
                            tracing::debug!(%session_id, error = %err, "ws write failed");
                            break CloseReason::WriteFailed;
                        }
                    }
                }
            }
        }
    };

    // Closing: refuse further frames, then leave the registry.
    outbound.close();
    let _ = registry.remove(session_id);

    if !close_transport(&mut ws_tx, reason == CloseReason::Cancelled, CLOSE_TIMEOUT).await {
        tracing::debug!(%session_id, "ws close timed out");
    }

    tracing::debug!(
        %session_id,
        reason = reason.as_str(),
        dropped = handle.dropped_count(),
        "ws session closed"
    );
}

/// Optionally sends a close frame, then closes `sink`, giving up after
/// `limit`. Returns `false` if the limit was hit.
async fn close_transport<S>(sink: &mut S, send_close: bool, limit: Duration) -> bool
where
    S: Sink<Message> + Unpin,
{
    let closing = async {
        if send_close {
            let _ = sink.send(Message::Close(None)).await;
        }
        let _ = sink.close().await;
    };
    tokio::time::timeout(limit, closing).await.is_ok()
}

/// Applies one inbound text frame to the session's subscription.
///
/// Frames that are not valid commands are discarded; the connection stays
/// open.
fn handle_text_message(text: &str, handle: &SessionHandle, registry: &SubscriptionRegistry) {
    match parse_command(text) {
        Ok(SubscriptionChange::Replace(subscription)) => {
            tracing::debug!(
                session_id = %handle.id(),
                collections = subscription.collections.len(),
                "subscription started"
            );
            registry.update_subscription(handle, Some(subscription));
        }
        Ok(SubscriptionChange::Clear) => {
            tracing::debug!(session_id = %handle.id(), "subscription stopped");
            registry.update_subscription(handle, None);
        }
        Err(err) => {
            tracing::debug!(session_id = %handle.id(), error = %err, "discarding ws frame");
        }
    }
}
