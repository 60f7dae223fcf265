// tests/integration/protocol_test.rs

//! End-to-end tests for the request/reply protocol.

use super::test_helpers::{TestServer, sorted_clients};
use std::time::Duration;

#[tokio::test]
async fn test_login_replies_ok() {
    let server = TestServer::start().await;
    let mut client = server.connect().await;

    assert_eq!(client.request("login alice").await, "login ok");

    server.shutdown().await;
}

#[tokio::test]
async fn test_ask_clients_lists_logged_in_users() {
    let server = TestServer::start().await;
    let mut alice = server.connect().await;
    let mut bob = server.connect().await;

    alice.login("alice").await;
    bob.login("bob").await;

    let reply = alice.request("ask_clients").await;
    assert_eq!(sorted_clients(&reply), vec!["alice", "bob"]);

    server.shutdown().await;
}

#[tokio::test]
async fn test_ask_clients_skips_anonymous_sessions() {
    let server = TestServer::start().await;
    let mut anonymous = server.connect().await;
    // A reply proves the anonymous session is registered.
    assert_eq!(anonymous.request("ping").await, "ping ok");

    let mut alice = server.connect().await;
    alice.login("alice").await;

    assert_eq!(anonymous.request("ask_clients").await, "clients alice");

    server.shutdown().await;
}

#[tokio::test]
async fn test_ask_clients_prefix_is_accepted() {
    let server = TestServer::start().await;
    let mut client = server.connect().await;
    client.login("carol").await;

    assert_eq!(client.request("ask_clients please").await, "clients carol");

    server.shutdown().await;
}

#[tokio::test]
async fn test_unknown_input_gets_no_reply_and_connection_stays_open() {
    let server = TestServer::start().await;
    let mut client = server.connect().await;

    client.send("xyz").await;
    assert_eq!(client.try_recv(Duration::from_millis(200)).await, None);

    assert_eq!(client.request("ping").await, "ping ok");

    server.shutdown().await;
}

#[tokio::test]
async fn test_login_without_name_is_ignored() {
    let server = TestServer::start().await;
    let mut client = server.connect().await;

    client.send("login ").await;
    assert_eq!(client.try_recv(Duration::from_millis(200)).await, None);
    assert_eq!(client.request("ping").await, "ping ok");
    assert_eq!(client.request("ask_clients").await, "clients ");

    server.shutdown().await;
}

#[tokio::test]
async fn test_message_split_across_writes_is_framed() {
    let server = TestServer::start().await;
    let mut client = server.connect().await;

    client.send_raw(b"lo").await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    client.send_raw(b"gin da").await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    client.send_raw(b"ve\n").await;

    assert_eq!(client.recv().await, "login ok");
    assert_eq!(client.request("ask_clients").await, "clients dave");

    server.shutdown().await;
}

#[tokio::test]
async fn test_pipelined_messages_are_answered_in_order() {
    let server = TestServer::start().await;
    let mut client = server.connect().await;

    client.send_raw(b"login erin\nping\nping\nask_clients\n").await;

    assert_eq!(client.recv().await, "login ok");
    // The login itself marks every registered session, the sender included.
    assert_eq!(client.recv().await, "ping client_list_changed");
    assert_eq!(client.recv().await, "ping ok");
    assert_eq!(client.recv().await, "clients erin");

    server.shutdown().await;
}

#[tokio::test]
async fn test_crlf_terminated_lines_are_accepted() {
    let server = TestServer::start().await;
    let mut client = server.connect().await;

    client.send_raw(b"login frank\r\n").await;
    assert_eq!(client.recv().await, "login ok");
    client.send_raw(b"ask_clients\r\n").await;
    assert_eq!(client.recv().await, "clients frank");

    server.shutdown().await;
}
