// tests/integration/broadcast_test.rs

//! Membership-change notification tests.

use super::test_helpers::{TestClient, TestServer, sorted_clients};
use std::time::Duration;

/// Pings until the server reports a changed client list, or gives up.
async fn ping_until_changed(client: &mut TestClient) -> bool {
    for _ in 0..50 {
        if client.request("ping").await == "ping client_list_changed" {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    false
}

#[tokio::test]
async fn test_login_marks_other_sessions_once() {
    let server = TestServer::start().await;
    let mut alice = server.connect().await;
    let mut bob = server.connect().await;

    alice.login("alice").await;
    // Consume the flag raised by alice's own login.
    alice.request("ping").await;
    // A reply proves bob's session is registered.
    bob.request("ping").await;

    bob.login("bob").await;

    assert_eq!(alice.request("ping").await, "ping client_list_changed");
    assert_eq!(alice.request("ping").await, "ping ok");
    assert_eq!(alice.request("ping").await, "ping ok");

    server.shutdown().await;
}

#[tokio::test]
async fn test_disconnect_marks_remaining_sessions() {
    let server = TestServer::start().await;
    let mut alice = server.connect().await;
    let mut bob = server.connect().await;

    alice.login("alice").await;
    bob.login("bob").await;
    assert_eq!(alice.request("ping").await, "ping client_list_changed");
    assert_eq!(alice.request("ping").await, "ping ok");

    drop(bob);

    assert!(ping_until_changed(&mut alice).await);
    assert_eq!(alice.request("ping").await, "ping ok");
    assert_eq!(
        sorted_clients(&alice.request("ask_clients").await),
        vec!["alice"]
    );

    server.shutdown().await;
}

#[tokio::test]
async fn test_plain_connect_does_not_broadcast() {
    let server = TestServer::start().await;
    let mut alice = server.connect().await;
    alice.login("alice").await;
    alice.request("ping").await;

    let mut anonymous = server.connect().await;
    assert_eq!(anonymous.request("ping").await, "ping ok");

    assert_eq!(alice.request("ping").await, "ping ok");

    server.shutdown().await;
}

#[tokio::test]
async fn test_many_clients_see_each_other() {
    let server = TestServer::start().await;
    let mut clients = Vec::new();
    for i in 0..8 {
        let mut client = server.connect().await;
        client.login(&format!("user{i}")).await;
        clients.push(client);
    }

    let mut expected: Vec<String> = (0..8).map(|i| format!("user{i}")).collect();
    expected.sort();
    for client in clients.iter_mut() {
        assert_eq!(
            sorted_clients(&client.request("ask_clients").await),
            expected
        );
    }

    server.shutdown().await;
}
