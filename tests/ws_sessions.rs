//! End-to-end tests for the change-event WebSocket endpoint.
#![allow(clippy::panic)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tokio_util::sync::CancellationToken;

use admin_events::api;
use admin_events::app_state::AppState;
use admin_events::domain::{ChangeEvent, ChangeEventType};
use admin_events::ws::AdminEventManager;

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

const WS_PATH: &str = "/admin/ws";

async fn start_server(queue_length: usize) -> (SocketAddr, AdminEventManager) {
    let events = AdminEventManager::new(queue_length, CancellationToken::new());
    let app = api::build_router(WS_PATH).with_state(AppState {
        events: events.clone(),
    });
    let Ok(listener) = tokio::net::TcpListener::bind("127.0.0.1:0").await else {
        panic!("failed to bind test listener");
    };
    let Ok(addr) = listener.local_addr() else {
        panic!("listener has no local address");
    };
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    (addr, events)
}

async fn connect(addr: SocketAddr) -> Client {
    let Ok((client, _)) = connect_async(format!("ws://{addr}{WS_PATH}")).await else {
        panic!("websocket connect failed");
    };
    client
}

async fn send_json(client: &mut Client, value: serde_json::Value) {
    if client.send(Message::text(value.to_string())).await.is_err() {
        panic!("failed to send frame");
    }
}

/// Polls `condition` until it holds, failing the test after five seconds.
async fn wait_until(condition: impl Fn() -> bool) {
    let polled = tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await;
    if polled.is_err() {
        panic!("condition not reached in time");
    }
}

fn subscribed_to(events: &AdminEventManager, collection: &str) -> bool {
    events.registry().snapshot().iter().any(|entry| {
        entry
            .subscription
            .as_ref()
            .is_some_and(|sub| sub.collections.contains(collection))
    })
}

/// Returns the next text frame, or `None` if nothing arrives in `wait`.
async fn next_text(client: &mut Client, wait: Duration) -> Option<String> {
    loop {
        match tokio::time::timeout(wait, client.next()).await {
            Ok(Some(Ok(Message::Text(text)))) => return Some(text.as_str().to_string()),
            Ok(Some(Ok(Message::Ping(_) | Message::Pong(_)))) => {}
            _ => return None,
        }
    }
}

#[tokio::test]
async fn filtered_start_delivers_only_exact_match() {
    let (addr, events) = start_server(16).await;
    let mut client = connect(addr).await;

    // Garbage first; it must be discarded without closing the connection.
    send_json(&mut client, serde_json::json!({"wrong": "data"})).await;
    send_json(
        &mut client,
        serde_json::json!({
            "type": "start",
            "collections": ["collection1"],
            "filter": {"types": ["created"], "namespaces": ["ns1"]},
        }),
    )
    .await;
    wait_until(|| subscribed_to(&events, "collection1")).await;

    events.dispatch(&ChangeEvent::new("collection2", ChangeEventType::Created, "ns1"));
    events.dispatch(&ChangeEvent::new("collection1", ChangeEventType::Deleted, "ns1"));
    events.dispatch(&ChangeEvent::new("collection1", ChangeEventType::Created, "ns2"));
    let matching = ChangeEvent::new("collection1", ChangeEventType::Created, "ns1")
        .with_id(uuid::Uuid::new_v4());
    events.dispatch(&matching);

    let Some(frame) = next_text(&mut client, Duration::from_secs(5)).await else {
        panic!("matching event was not delivered");
    };
    let Ok(expected) = serde_json::to_string(&matching) else {
        panic!("serialization failed");
    };
    assert_eq!(frame, expected);

    // Exactly once, and nothing from the non-matching events.
    assert!(next_text(&mut client, Duration::from_millis(200)).await.is_none());
}

#[tokio::test]
async fn connection_without_start_receives_nothing() {
    let (addr, events) = start_server(16).await;
    let mut client = connect(addr).await;
    wait_until(|| events.session_count() == 1).await;

    for _ in 0..50 {
        events.dispatch(&ChangeEvent::new("messages", ChangeEventType::Created, "ns1"));
    }
    assert!(next_text(&mut client, Duration::from_millis(200)).await.is_none());
}

#[tokio::test]
async fn second_start_replaces_first() {
    let (addr, events) = start_server(16).await;
    let mut client = connect(addr).await;

    send_json(
        &mut client,
        serde_json::json!({"type": "start", "collections": ["messages"]}),
    )
    .await;
    wait_until(|| subscribed_to(&events, "messages")).await;
    send_json(
        &mut client,
        serde_json::json!({"type": "start", "collections": ["batches"]}),
    )
    .await;
    wait_until(|| subscribed_to(&events, "batches")).await;

    events.dispatch(&ChangeEvent::new("messages", ChangeEventType::Created, "ns1"));
    let batch = ChangeEvent::new("batches", ChangeEventType::Updated, "ns1");
    events.dispatch(&batch);

    let Some(frame) = next_text(&mut client, Duration::from_secs(5)).await else {
        panic!("batch event was not delivered");
    };
    let Ok(received) = serde_json::from_str::<ChangeEvent>(&frame) else {
        panic!("frame is not a change event");
    };
    assert_eq!(received, batch);
}

#[tokio::test]
async fn stop_clears_subscription() {
    let (addr, events) = start_server(16).await;
    let mut client = connect(addr).await;

    send_json(
        &mut client,
        serde_json::json!({"type": "start", "collections": ["messages"]}),
    )
    .await;
    wait_until(|| subscribed_to(&events, "messages")).await;
    send_json(&mut client, serde_json::json!({"type": "stop"})).await;
    wait_until(|| !subscribed_to(&events, "messages")).await;

    events.dispatch(&ChangeEvent::new("messages", ChangeEventType::Created, "ns1"));
    assert!(next_text(&mut client, Duration::from_millis(200)).await.is_none());
}

#[tokio::test]
async fn events_are_delivered_in_dispatch_order() {
    let (addr, events) = start_server(64).await;
    let mut client = connect(addr).await;

    send_json(
        &mut client,
        serde_json::json!({"type": "start", "collections": ["messages"]}),
    )
    .await;
    wait_until(|| subscribed_to(&events, "messages")).await;

    let ids: Vec<uuid::Uuid> = (0..20).map(|_| uuid::Uuid::new_v4()).collect();
    for id in &ids {
        events.dispatch(&ChangeEvent::new("messages", ChangeEventType::Created, "ns1").with_id(*id));
    }
    for id in &ids {
        let Some(frame) = next_text(&mut client, Duration::from_secs(5)).await else {
            panic!("missing event");
        };
        let Ok(received) = serde_json::from_str::<ChangeEvent>(&frame) else {
            panic!("frame is not a change event");
        };
        assert_eq!(received.id, Some(*id));
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_producers_keep_their_own_order() {
    const PRODUCERS: usize = 4;
    const PER_PRODUCER: usize = 25;

    let (addr, events) = start_server(256).await;
    let mut client = connect(addr).await;
    send_json(
        &mut client,
        serde_json::json!({"type": "start", "collections": ["messages"]}),
    )
    .await;
    wait_until(|| subscribed_to(&events, "messages")).await;

    let plans: Vec<(String, Vec<uuid::Uuid>)> = (0..PRODUCERS)
        .map(|n| {
            let ids = (0..PER_PRODUCER).map(|_| uuid::Uuid::new_v4()).collect();
            (format!("p{n}"), ids)
        })
        .collect();

    let producers: Vec<_> = plans
        .iter()
        .cloned()
        .map(|(namespace, ids)| {
            let events = events.clone();
            tokio::spawn(async move {
                for id in ids {
                    events.dispatch(
                        &ChangeEvent::new("messages", ChangeEventType::Updated, namespace.as_str())
                            .with_id(id),
                    );
                    tokio::task::yield_now().await;
                }
            })
        })
        .collect();
    for producer in producers {
        if producer.await.is_err() {
            panic!("producer task failed");
        }
    }

    let mut received: HashMap<String, Vec<uuid::Uuid>> = HashMap::new();
    for _ in 0..PRODUCERS * PER_PRODUCER {
        let Some(frame) = next_text(&mut client, Duration::from_secs(5)).await else {
            panic!("missing event");
        };
        let Ok(event) = serde_json::from_str::<ChangeEvent>(&frame) else {
            panic!("frame is not a change event");
        };
        let Some(id) = event.id else {
            panic!("event lost its id");
        };
        received.entry(event.namespace).or_default().push(id);
    }

    for (namespace, ids) in &plans {
        assert_eq!(received.get(namespace), Some(ids), "order broken for {namespace}");
    }
}

#[tokio::test]
async fn saturated_session_stays_open_and_reports_drops() {
    let (addr, events) = start_server(1).await;
    let mut client = connect(addr).await;
    send_json(
        &mut client,
        serde_json::json!({"type": "start", "collections": ["messages"]}),
    )
    .await;
    wait_until(|| subscribed_to(&events, "messages")).await;

    // No await in between: the session task cannot drain its queue of one.
    for _ in 0..200 {
        events.dispatch(&ChangeEvent::new("messages", ChangeEventType::Created, "ns1"));
    }
    while next_text(&mut client, Duration::from_millis(200)).await.is_some() {}

    // Still connected and still subscribed.
    assert_eq!(events.session_count(), 1);
    let marker = uuid::Uuid::new_v4();
    events.dispatch(&ChangeEvent::new("messages", ChangeEventType::Deleted, "ns1").with_id(marker));
    let Some(frame) = next_text(&mut client, Duration::from_secs(5)).await else {
        panic!("session stopped receiving after saturation");
    };
    let Ok(received) = serde_json::from_str::<ChangeEvent>(&frame) else {
        panic!("frame is not a change event");
    };
    assert_eq!(received.id, Some(marker));

    let Ok(response) = reqwest::get(format!("http://{addr}/admin/events/status")).await else {
        panic!("status request failed");
    };
    let Ok(status) = response.json::<serde_json::Value>().await else {
        panic!("status body is not JSON");
    };
    assert_eq!(status["session_count"], 1);
    let Some(dropped) = status["sessions"][0]["dropped"].as_u64() else {
        panic!("dropped counter missing");
    };
    assert!(dropped > 0);
}

#[tokio::test]
async fn peer_close_removes_session() {
    let (addr, events) = start_server(16).await;
    let mut client = connect(addr).await;
    wait_until(|| events.session_count() == 1).await;

    let _ = client.close(None).await;
    wait_until(|| events.session_count() == 0).await;
}

#[tokio::test]
async fn cancel_closes_sessions_and_drain_completes() {
    let (addr, events) = start_server(16).await;
    let mut first = connect(addr).await;
    let mut second = connect(addr).await;
    send_json(
        &mut first,
        serde_json::json!({"type": "start", "collections": ["messages"]}),
    )
    .await;
    wait_until(|| events.session_count() == 2).await;

    events.cancel();
    let drained = tokio::time::timeout(Duration::from_secs(5), events.wait_stop()).await;
    assert!(drained.is_ok(), "drain did not complete");
    assert_eq!(events.session_count(), 0);

    // Dispatch after cancellation is a silent no-op.
    events.dispatch(&ChangeEvent::new("messages", ChangeEventType::Created, "ns1"));
    assert!(next_text(&mut first, Duration::from_millis(200)).await.is_none());
    assert!(next_text(&mut second, Duration::from_millis(200)).await.is_none());
}

#[tokio::test]
async fn upgrade_after_cancel_is_refused() {
    let (addr, events) = start_server(16).await;
    events.cancel();

    let attempt = connect_async(format!("ws://{addr}{WS_PATH}")).await;
    assert!(attempt.is_err());
    assert_eq!(events.session_count(), 0);
}

#[tokio::test]
async fn non_upgrade_post_is_rejected() {
    let (addr, events) = start_server(16).await;

    let Ok(response) = reqwest::Client::new()
        .post(format!("http://{addr}{WS_PATH}"))
        .header("content-type", "application/json")
        .body("{}")
        .send()
        .await
    else {
        panic!("request failed");
    };
    assert!(response.status().as_u16() >= 300);
    assert_eq!(events.session_count(), 0);
}
