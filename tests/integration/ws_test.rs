//! WebSocket integration tests against a live server.

mod helpers;

use std::net::SocketAddr;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use devicehub_database::DeviceSessionStore;
use helpers::{TestApp, token_for};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

const RECV_TIMEOUT: Duration = Duration::from_secs(2);

async fn connect(addr: SocketAddr, device_id: &str, user: &str) -> Client {
    let url = format!("ws://{addr}/ws/{device_id}?token={}", token_for(user));
    let (stream, _) = connect_async(url).await.expect("WebSocket connect failed");
    stream
}

async fn send_json(client: &mut Client, value: Value) {
    client
        .send(Message::Text(value.to_string().into()))
        .await
        .expect("send failed");
}

/// Next text frame as JSON, skipping control frames.
async fn next_json(client: &mut Client) -> Value {
    loop {
        let msg = tokio::time::timeout(RECV_TIMEOUT, client.next())
            .await
            .expect("timed out waiting for frame")
            .expect("stream ended")
            .expect("read failed");
        if let Message::Text(text) = msg {
            return serde_json::from_str(text.as_str()).expect("frame is not JSON");
        }
    }
}

async fn wait_for_registration(app: &TestApp, device_id: &str) {
    for _ in 0..50 {
        if app.state.registry.is_connected(device_id) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("device {device_id} never registered");
}

#[tokio::test]
async fn test_ping_pong() {
    let app = TestApp::new();
    let addr = app.spawn_server().await;
    app.login("alice", "dev-1", "Chrome").await;

    let mut client = connect(addr, "dev-1", "alice").await;
    send_json(&mut client, json!({"type": "ping"})).await;

    assert_eq!(next_json(&mut client).await, json!({"type": "pong"}));
}

#[tokio::test]
async fn test_invalid_frame_gets_error_reply() {
    let app = TestApp::new();
    let addr = app.spawn_server().await;

    let mut client = connect(addr, "dev-1", "alice").await;
    client
        .send(Message::Text("not json".into()))
        .await
        .unwrap();

    let reply = next_json(&mut client).await;
    assert_eq!(reply["type"], "error");
    assert_eq!(reply["code"], "INVALID_MESSAGE");

    // The connection stays usable.
    send_json(&mut client, json!({"type": "ping"})).await;
    assert_eq!(next_json(&mut client).await, json!({"type": "pong"}));
}

#[tokio::test]
async fn test_activity_updates_last_activity() {
    let app = TestApp::new();
    let addr = app.spawn_server().await;
    app.login("alice", "dev-1", "Chrome").await;
    let before = app
        .store
        .find_by_device_id("dev-1")
        .await
        .unwrap()
        .unwrap()
        .last_activity;

    let mut client = connect(addr, "dev-1", "alice").await;
    tokio::time::sleep(Duration::from_millis(10)).await;
    send_json(&mut client, json!({"type": "activity"})).await;
    // A ping after the activity frame orders the two on the server.
    send_json(&mut client, json!({"type": "ping"})).await;
    next_json(&mut client).await;

    let after = app
        .store
        .find_by_device_id("dev-1")
        .await
        .unwrap()
        .unwrap()
        .last_activity;
    assert!(after > before);
}

#[tokio::test]
async fn test_force_logout_pushes_frame_then_closes() {
    let app = TestApp::new();
    let addr = app.spawn_server().await;
    app.login("alice", "dev-1", "Chrome").await;
    app.login("alice", "dev-2", "Safari").await;

    let mut client = connect(addr, "dev-1", "alice").await;
    wait_for_registration(&app, "dev-1").await;

    let response = app
        .request(
            "POST",
            "/api/auth/force-logout",
            Some(json!({"target_device_id": "dev-1", "current_device_id": "dev-2"})),
            Some(&token_for("alice")),
        )
        .await;
    assert_eq!(response.body["success"], true);

    let frame = next_json(&mut client).await;
    assert_eq!(frame["type"], "force_logout");
    assert_eq!(
        frame["message"],
        "You have been logged out by another device"
    );
    assert!(frame["timestamp"].as_str().unwrap().ends_with('Z'));

    // Only a close frame or end of stream may follow.
    let closed = tokio::time::timeout(RECV_TIMEOUT, async {
        while let Some(msg) = client.next().await {
            match msg {
                Ok(Message::Close(_)) | Err(_) => return,
                Ok(Message::Text(text)) => panic!("unexpected frame after logout: {}", text.as_str()),
                Ok(_) => {}
            }
        }
    })
    .await;
    assert!(closed.is_ok(), "channel not closed within grace window");

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!app.state.registry.is_connected("dev-1"));
}

#[tokio::test]
async fn test_takeover_by_other_user_evicts_previous_channel() {
    let app = TestApp::new();
    let addr = app.spawn_server().await;
    app.login("bob", "shared", "Edge").await;

    let mut client = connect(addr, "shared", "bob").await;
    wait_for_registration(&app, "shared").await;

    let response = app.login("alice", "shared", "Chrome").await;
    assert_eq!(response.body["success"], true);

    let frame = next_json(&mut client).await;
    assert_eq!(frame["type"], "force_logout");
    assert_eq!(frame["message"], "This device was signed in to another account");

    let closed = tokio::time::timeout(RECV_TIMEOUT, async {
        while let Some(msg) = client.next().await {
            if matches!(msg, Ok(Message::Close(_)) | Err(_)) {
                return;
            }
        }
    })
    .await;
    assert!(closed.is_ok(), "previous owner's channel left open");
}

#[tokio::test]
async fn test_logout_notification_via_registry() {
    let app = TestApp::new();
    let addr = app.spawn_server().await;

    let mut client = connect(addr, "dev-x", "alice").await;
    wait_for_registration(&app, "dev-x").await;

    app.state
        .registry
        .send_logout_notification("dev-x", "evicted")
        .await;

    let frame = next_json(&mut client).await;
    assert_eq!(frame["type"], "force_logout");
    assert_eq!(frame["message"], "evicted");
    assert!(!app.state.registry.is_connected("dev-x"));
}

#[tokio::test]
async fn test_upgrade_rejected_without_token() {
    let app = TestApp::new();
    let addr = app.spawn_server().await;

    let err = connect_async(format!("ws://{addr}/ws/dev-1"))
        .await
        .expect_err("upgrade should be refused");
    match err {
        tokio_tungstenite::tungstenite::Error::Http(response) => {
            assert_eq!(response.status().as_u16(), 401);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(app.state.registry.connection_count(), 0);
}

#[tokio::test]
async fn test_upgrade_rejected_for_other_users_device() {
    let app = TestApp::new();
    let addr = app.spawn_server().await;
    app.login("bob", "dev-b", "Edge").await;

    let err = connect_async(format!(
        "ws://{addr}/ws/dev-b?token={}",
        token_for("alice")
    ))
    .await
    .expect_err("upgrade should be refused");
    match err {
        tokio_tungstenite::tungstenite::Error::Http(response) => {
            assert_eq!(response.status().as_u16(), 403);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_reconnect_replaces_registration() {
    let app = TestApp::new();
    let addr = app.spawn_server().await;

    let first = connect(addr, "dev-1", "alice").await;
    wait_for_registration(&app, "dev-1").await;
    let first_id = app.state.registry.get("dev-1").unwrap().id;

    let mut second = connect(addr, "dev-1", "alice").await;
    let mut second_id = first_id;
    for _ in 0..50 {
        second_id = app.state.registry.get("dev-1").unwrap().id;
        if second_id != first_id {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_ne!(first_id, second_id);

    // Closing the old socket must not evict the new registration.
    drop(first);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(app.state.registry.get("dev-1").unwrap().id, second_id);

    send_json(&mut second, json!({"type": "ping"})).await;
    assert_eq!(next_json(&mut second).await, json!({"type": "pong"}));
}
