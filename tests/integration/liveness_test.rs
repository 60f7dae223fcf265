// tests/integration/liveness_test.rs

//! Liveness timeout tests. Most run with a short timeout to keep them fast.

use super::test_helpers::{TestClient, TestServer, test_config};
use lobbyd::config::Config;
use std::time::Duration;

const SHORT_TIMEOUT_MS: u64 = 300;

fn short_timeout_config() -> Config {
    Config {
        liveness_timeout_ms: SHORT_TIMEOUT_MS,
        ..test_config()
    }
}

#[tokio::test]
async fn test_silent_client_is_disconnected_with_default_timeout() {
    let server = TestServer::start().await;
    let mut client = server.connect().await;

    let closed_after = client
        .wait_for_close(Duration::from_secs(10))
        .await
        .expect("Silent client was never disconnected");
    assert!(closed_after >= Duration::from_millis(4900), "{closed_after:?}");
    assert!(closed_after < Duration::from_millis(10000), "{closed_after:?}");

    server.shutdown().await;
}

#[tokio::test]
async fn test_silent_client_is_disconnected_with_short_timeout() {
    let server = TestServer::with_config(short_timeout_config()).await;
    let mut client = server.connect().await;

    let closed_after = client
        .wait_for_close(Duration::from_secs(3))
        .await
        .expect("Silent client was never disconnected");
    assert!(closed_after >= Duration::from_millis(250), "{closed_after:?}");
    assert!(
        closed_after < Duration::from_millis(2 * SHORT_TIMEOUT_MS),
        "{closed_after:?}"
    );

    server.shutdown().await;
}

#[tokio::test]
async fn test_pinging_client_stays_connected() {
    let server = TestServer::with_config(short_timeout_config()).await;
    let mut client = server.connect().await;

    for _ in 0..10 {
        assert_eq!(client.request("ping").await, "ping ok");
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    server.shutdown().await;
}

#[tokio::test]
async fn test_any_read_postpones_the_deadline() {
    let server = TestServer::with_config(short_timeout_config()).await;
    let mut client = server.connect().await;

    // Ignored input still completes a read, which rearms the deadline.
    for _ in 0..10 {
        client.send("xyz").await;
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    assert_eq!(client.request("ping").await, "ping ok");

    server.shutdown().await;
}

#[tokio::test]
async fn test_timeout_disconnect_notifies_others() {
    let server = TestServer::with_config(short_timeout_config()).await;
    let mut alice = server.connect().await;
    alice.login("alice").await;
    alice.request("ping").await;

    let mut bob = server.connect().await;
    bob.login("bob").await;
    assert_eq!(alice.request("ping").await, "ping client_list_changed");

    // bob goes silent while alice keeps pinging.
    let mut saw_change = false;
    for _ in 0..10 {
        tokio::time::sleep(Duration::from_millis(100)).await;
        if alice.request("ping").await == "ping client_list_changed" {
            saw_change = true;
            break;
        }
    }
    assert!(saw_change, "alice was never told bob timed out");
    assert_eq!(alice.request("ask_clients").await, "clients alice");
    assert!(bob.wait_for_close(Duration::from_secs(1)).await.is_some());

    server.shutdown().await;
}

#[tokio::test]
async fn test_oversized_message_wedges_until_timeout() {
    let config = Config {
        max_message_size: 16,
        ..short_timeout_config()
    };
    let server = TestServer::with_config(config).await;
    let mut client: TestClient = server.connect().await;
    assert_eq!(client.request("ping").await, "ping ok");

    client.send_raw(&[b'a'; 32]).await;
    client.send("ping").await;

    // No reply ever comes; the liveness timer ends the session instead.
    let closed_after = client
        .wait_for_close(Duration::from_secs(3))
        .await
        .expect("Wedged client was never disconnected");
    assert!(closed_after < Duration::from_millis(2 * SHORT_TIMEOUT_MS));

    server.shutdown().await;
}
