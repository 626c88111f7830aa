//! Connection registry behaviour under concurrent use.

use std::sync::Arc;
use std::time::Duration;

use devicehub_core::config::RealtimeConfig;
use devicehub_realtime::{ConnectionRegistry, OutboundMessage};

fn registry() -> Arc<ConnectionRegistry> {
    Arc::new(ConnectionRegistry::with_settings(
        8,
        Duration::from_millis(20),
    ))
}

#[tokio::test]
async fn test_registry_from_config() {
    let config = RealtimeConfig {
        channel_buffer_size: 1,
        logout_grace_millis: 5,
    };
    let registry = ConnectionRegistry::new(&config);
    let (_handle, _rx) = registry.connect("d1", "u1");

    assert!(registry.send_notification("d1", OutboundMessage::Pong));
    // Buffer of one is now full and the frame is refused.
    assert!(!registry.send_notification("d1", OutboundMessage::Pong));
    assert!(!registry.is_connected("d1"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_connect_and_release_leaves_latest() {
    let registry = registry();

    let tasks: Vec<_> = (0..16)
        .map(|_| {
            let registry = Arc::clone(&registry);
            tokio::spawn(async move {
                let (handle, rx) = registry.connect("d1", "u1");
                tokio::task::yield_now().await;
                // Each task cleans up its own instance only.
                registry.release("d1", handle.id);
                drop(rx);
            })
        })
        .collect();
    for task in tasks {
        task.await.unwrap();
    }

    // Every instance released itself; a stale release never removed a
    // newer registration that was still live.
    assert!(!registry.is_connected("d1"));

    let (latest, _rx) = registry.connect("d1", "u1");
    assert_eq!(registry.get("d1").unwrap().id, latest.id);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_parallel_logout_notifications_for_many_devices() {
    let registry = registry();
    let mut receivers = Vec::new();
    for i in 0..10 {
        let (_handle, rx) = registry.connect(&format!("d{i}"), "u1");
        receivers.push(rx);
    }

    let started = std::time::Instant::now();
    let tasks: Vec<_> = (0..10)
        .map(|i| {
            let registry = Arc::clone(&registry);
            tokio::spawn(async move {
                registry
                    .send_logout_notification(&format!("d{i}"), "bye")
                    .await
            })
        })
        .collect();
    for task in tasks {
        task.await.unwrap();
    }

    // Grace periods overlap rather than queue behind one another.
    assert!(started.elapsed() < Duration::from_millis(500));
    assert_eq!(registry.connection_count(), 0);

    for mut rx in receivers {
        match rx.recv().await {
            Some(OutboundMessage::ForceLogout { message, .. }) => assert_eq!(message, "bye"),
            other => panic!("expected force_logout, got {other:?}"),
        }
    }
}

#[tokio::test]
async fn test_broadcast_skips_dead_connections() {
    let registry = registry();
    let (_a, mut rx_a) = registry.connect("a", "u1");
    let (_b, rx_b) = registry.connect("b", "u1");
    drop(rx_b);

    let delivered = registry.broadcast_to_user("u1", &OutboundMessage::notification("hi", None));
    assert_eq!(delivered, 1);
    assert!(rx_a.recv().await.is_some());
    assert!(!registry.is_connected("b"));
    assert!(registry.is_connected("a"));
}
