//! Client Integration Tests
//!
//! These tests drive the full client against an in-process mock gateway;
//! no external services are required.
//!
//! Run with: cargo test -p integration-tests --test client_tests

use std::time::{Duration, Instant};

use serde_json::json;

use integration_tests::{
    establish_live, fixtures::*, test_client_config, wait_for_state, MockGateway, RECV_TIMEOUT,
};
use trickle_client::{ClientState, PushClient};

// ============================================================================
// Handshake & Session Tests
// ============================================================================

#[tokio::test]
async fn test_handshake_sends_connect_with_bearer_token() {
    let mut gateway = MockGateway::start().await.expect("Failed to start gateway");
    let client = PushClient::new(test_client_config(&gateway.url()))
        .await
        .unwrap();
    client.initialize("tok en", "user-1").await.unwrap();

    let mut conn = gateway.accept().await.unwrap();
    assert!(
        conn.uri.contains("authToken=Bearer%20tok%20en"),
        "unexpected uri: {}",
        conn.uri
    );

    let frame = conn.expect_frame("connect").await.unwrap();
    assert_eq!(frame["action"], "message");
    assert_eq!(frame["authorization"], "Bearer tok en");
    assert!(frame["id"].as_str().is_some_and(|id| !id.is_empty()));

    client.close().await.unwrap();
}

#[tokio::test]
async fn test_session_establishes_and_hello_follows_dictated_cadence() {
    let mut gateway = MockGateway::start().await.expect("Failed to start gateway");
    let client = PushClient::new(test_client_config(&gateway.url()))
        .await
        .unwrap();
    let mut states = client.state_changes();
    client.initialize("token-1", "user-1").await.unwrap();

    let mut conn = gateway.accept().await.unwrap();
    conn.expect_frame("connect").await.unwrap();
    conn.send_frame(&connect_success_frame("conn-1", 1, 30))
        .await
        .unwrap();
    wait_for_state(&mut states, ClientState::AwaitingHello).await;

    let hello = conn.expect_frame("connect_hello").await.unwrap();
    assert_eq!(hello["data"]["userId"], "user-1");

    conn.send_frame(&hello_ack_frame("conn-1")).await.unwrap();
    wait_for_state(&mut states, ClientState::Live).await;

    // The keep-alive keeps firing on the dictated interval
    let again = conn.expect_frame("connect_hello").await.unwrap();
    assert_eq!(again["data"]["userId"], "user-1");

    client.close().await.unwrap();
}

#[tokio::test]
async fn test_malformed_frames_are_dropped_without_killing_the_session() {
    let mut gateway = MockGateway::start().await.expect("Failed to start gateway");
    let client = PushClient::new(test_client_config(&gateway.url()))
        .await
        .unwrap();
    client.initialize("token-1", "user-1").await.unwrap();
    let mut conn = establish_live(&mut gateway, &client, "conn-1").await.unwrap();

    conn.send_text("this is not json").await.unwrap();
    conn.send_text("{}").await.unwrap();
    conn.send_text(r#"{"path":"warp_drive","data":1}"#).await.unwrap();
    // Payload that does not match its path's shape
    conn.send_frame(&json!({
        "id": "srv-bad",
        "action": "message",
        "path": "connect_success",
        "data": [{ "connectionId": "evil" }],
    }))
    .await
    .unwrap();
    // Client-only path arriving inbound
    conn.send_frame(&json!({
        "id": "srv-bad2",
        "action": "message",
        "path": "connect",
        "data": null,
    }))
    .await
    .unwrap();
    // Informational frames ride the same loop without side effects
    conn.send_frame(&sync_frame()).await.unwrap();
    conn.send_frame(&room_members_frame("workspace:9", &["member-1"]))
        .await
        .unwrap();

    // The connection survives it all and still processes real frames
    let mut changes = client.data_changed();
    conn.send_frame(&change_notify_frame(&["workspace:9:trickle"]))
        .await
        .unwrap();
    tokio::time::timeout(RECV_TIMEOUT, changes.recv())
        .await
        .expect("client stopped processing frames")
        .unwrap();
    assert_eq!(client.state(), ClientState::Live);

    client.close().await.unwrap();
}

// ============================================================================
// Reconnection Tests
// ============================================================================

#[tokio::test]
async fn test_dead_countdown_rebuilds_the_connection() {
    let mut gateway = MockGateway::start().await.expect("Failed to start gateway");
    let client = PushClient::new(test_client_config(&gateway.url()))
        .await
        .unwrap();
    client.initialize("token-1", "user-1").await.unwrap();

    let mut conn1 = gateway.accept().await.unwrap();
    conn1.expect_frame("connect").await.unwrap();
    conn1
        .send_frame(&connect_success_frame("conn-1", 1, 2))
        .await
        .unwrap();
    // One acknowledgement arms the two-second countdown; then silence
    conn1.send_frame(&hello_ack_frame("conn-1")).await.unwrap();

    let mut conn2 = gateway.accept().await.unwrap();
    conn2.expect_frame("connect").await.unwrap();
    conn2
        .send_frame(&connect_success_frame("conn-2", 1, 30))
        .await
        .unwrap();
    conn2.send_frame(&hello_ack_frame("conn-2")).await.unwrap();

    let mut states = client.state_changes();
    wait_for_state(&mut states, ClientState::Live).await;

    client.close().await.unwrap();
}

#[tokio::test]
async fn test_dropped_handshake_retries_under_the_policy() {
    let mut gateway = MockGateway::start().await.expect("Failed to start gateway");
    let client = PushClient::new(test_client_config(&gateway.url()))
        .await
        .unwrap();
    client.initialize("token-1", "user-1").await.unwrap();

    // Drop the first connection before any session is established
    let mut conn1 = gateway.accept().await.unwrap();
    conn1.expect_frame("connect").await.unwrap();
    conn1.close().await;

    let mut conn2 = gateway.accept().await.unwrap();
    conn2.expect_frame("connect").await.unwrap();

    client.close().await.unwrap();
}

#[tokio::test]
async fn test_server_dictated_retry_interval_paces_the_reconnect() {
    let mut gateway = MockGateway::start().await.expect("Failed to start gateway");
    let client = PushClient::new(test_client_config(&gateway.url()))
        .await
        .unwrap();
    client.initialize("token-1", "user-1").await.unwrap();

    let mut conn1 = gateway.accept().await.unwrap();
    conn1.expect_frame("connect").await.unwrap();
    conn1
        .send_frame(&connect_success_with_retry("conn-1", 1, 1, 2))
        .await
        .unwrap();
    conn1.send_frame(&hello_ack_frame("conn-1")).await.unwrap();
    let armed_at = Instant::now();

    // Death after ~1s, then the server-dictated 2s pause before redialing;
    // the 100ms fallback from the config must not be used
    let _conn2 = gateway.accept().await.unwrap();
    let elapsed = armed_at.elapsed();
    assert!(
        elapsed >= Duration::from_millis(2500),
        "reconnected after {elapsed:?}"
    );

    client.close().await.unwrap();
}

#[tokio::test]
async fn test_initialize_replaces_the_connection_with_new_credentials() {
    let mut gateway = MockGateway::start().await.expect("Failed to start gateway");
    let client = PushClient::new(test_client_config(&gateway.url()))
        .await
        .unwrap();
    client.initialize("token-1", "user-1").await.unwrap();
    let _conn1 = establish_live(&mut gateway, &client, "conn-1").await.unwrap();

    client.initialize("token-2", "user-1").await.unwrap();

    let mut conn2 = gateway.accept().await.unwrap();
    assert!(
        conn2.uri.contains("authToken=Bearer%20token-2"),
        "unexpected uri: {}",
        conn2.uri
    );
    let frame = conn2.expect_frame("connect").await.unwrap();
    assert_eq!(frame["authorization"], "Bearer token-2");

    client.close().await.unwrap();
}

// ============================================================================
// Room Membership Tests
// ============================================================================

#[tokio::test]
async fn test_room_membership_is_restored_after_reconnect() {
    let mut gateway = MockGateway::start().await.expect("Failed to start gateway");
    let client = PushClient::new(test_client_config(&gateway.url()))
        .await
        .unwrap();

    // Membership can be declared before any connection exists
    client.join_room("42", "member-1").await.unwrap();
    client.initialize("token-1", "user-1").await.unwrap();

    let mut conn1 = gateway.accept().await.unwrap();
    conn1.expect_frame("connect").await.unwrap();
    conn1
        .send_frame(&connect_success_frame("conn-1", 1, 2))
        .await
        .unwrap();
    conn1.send_frame(&hello_ack_frame("conn-1")).await.unwrap();

    let join = conn1.wait_for_frame("join_room").await.unwrap();
    assert_eq!(join["data"]["roomId"], "workspace:42");
    assert_eq!(join["data"]["memberId"], "member-1");
    assert_eq!(join["data"]["status"], "online");

    conn1.send_frame(&join_room_ack_frame()).await.unwrap();
    // Presence refresh runs once the join is acknowledged
    let status = conn1.wait_for_frame("room_status").await.unwrap();
    assert_eq!(status["data"]["roomId"], "workspace:42");
    assert_eq!(status["data"]["status"], "online");

    // No more hello acks; the dead-countdown forces a new connection,
    // which must re-join the room on its own
    let mut conn2 = gateway.accept().await.unwrap();
    conn2.expect_frame("connect").await.unwrap();
    conn2
        .send_frame(&connect_success_frame("conn-2", 1, 30))
        .await
        .unwrap();

    let rejoin = conn2.wait_for_frame("join_room").await.unwrap();
    assert_eq!(rejoin["data"]["roomId"], "workspace:42");
    assert_eq!(rejoin["data"]["memberId"], "member-1");

    client.close().await.unwrap();
}

#[tokio::test]
async fn test_commands_apply_in_order() {
    let mut gateway = MockGateway::start().await.expect("Failed to start gateway");
    let client = PushClient::new(test_client_config(&gateway.url()))
        .await
        .unwrap();
    client.initialize("token-1", "user-1").await.unwrap();
    let mut conn = establish_live(&mut gateway, &client, "conn-1").await.unwrap();

    client.join_room("1", "member-1").await.unwrap();
    client.leave_room("1", "member-1").await.unwrap();
    client.join_room("2", "member-1").await.unwrap();

    let first = conn.expect_frame("join_room").await.unwrap();
    assert_eq!(first["data"]["roomId"], "workspace:1");
    let second = conn.expect_frame("leave_room").await.unwrap();
    assert_eq!(second["data"]["roomId"], "workspace:1");
    assert_eq!(second["data"]["status"], "offline");
    let third = conn.expect_frame("join_room").await.unwrap();
    assert_eq!(third["data"]["roomId"], "workspace:2");

    client.close().await.unwrap();
}

#[tokio::test]
async fn test_leave_room_clears_the_membership() {
    let mut gateway = MockGateway::start().await.expect("Failed to start gateway");
    let client = PushClient::new(test_client_config(&gateway.url()))
        .await
        .unwrap();
    client.initialize("token-1", "user-1").await.unwrap();
    let mut conn = establish_live(&mut gateway, &client, "conn-1").await.unwrap();

    client.join_room("42", "member-1").await.unwrap();
    conn.expect_frame("join_room").await.unwrap();

    client.leave_room("42", "member-1").await.unwrap();
    let leave = conn.expect_frame("leave_room").await.unwrap();
    assert_eq!(leave["data"]["memberId"], "member-1");
    assert_eq!(leave["data"]["status"], "offline");

    // Membership is gone, so close has nothing left to leave
    client.close().await.unwrap();
    if let Some(frame) = conn.try_recv_frame(Duration::from_millis(500)).await {
        assert_ne!(frame["path"], "leave_room");
    }
}

// ============================================================================
// Change Signal Tests
// ============================================================================

#[tokio::test]
async fn test_change_notify_signals_subscribers() {
    let mut gateway = MockGateway::start().await.expect("Failed to start gateway");
    let client = PushClient::new(test_client_config(&gateway.url()))
        .await
        .unwrap();
    client.initialize("token-1", "user-1").await.unwrap();
    let mut conn = establish_live(&mut gateway, &client, "conn-1").await.unwrap();
    let mut changes = client.data_changed();

    conn.send_frame(&change_notify_frame(&["workspace:42:trickle"]))
        .await
        .unwrap();
    tokio::time::timeout(RECV_TIMEOUT, changes.recv())
        .await
        .expect("no change signal")
        .unwrap();

    // Codes that do not target a workspace trickle stay silent
    conn.send_frame(&change_notify_frame(&[
        "workspace:42:other",
        "assistant:7:trickle",
        "workspace:4a2:trickle",
    ]))
    .await
    .unwrap();
    assert!(
        tokio::time::timeout(Duration::from_millis(500), changes.recv())
            .await
            .is_err()
    );

    // Several matching codes in one frame collapse into one signal
    conn.send_frame(&change_notify_frame(&[
        "workspace:1:trickle",
        "workspace:2:trickle",
    ]))
    .await
    .unwrap();
    tokio::time::timeout(RECV_TIMEOUT, changes.recv())
        .await
        .expect("no change signal")
        .unwrap();
    assert!(
        tokio::time::timeout(Duration::from_millis(300), changes.recv())
            .await
            .is_err()
    );

    client.close().await.unwrap();
}

// ============================================================================
// Close Tests
// ============================================================================

#[tokio::test]
async fn test_close_sends_leave_and_is_idempotent() {
    let mut gateway = MockGateway::start().await.expect("Failed to start gateway");
    let client = PushClient::new(test_client_config(&gateway.url()))
        .await
        .unwrap();

    client.join_room("42", "member-1").await.unwrap();
    client.initialize("token-1", "user-1").await.unwrap();
    let mut conn = establish_live(&mut gateway, &client, "conn-1").await.unwrap();
    let mut states = client.state_changes();

    client.close().await.unwrap();
    let leave = conn.wait_for_frame("leave_room").await.unwrap();
    assert_eq!(leave["data"]["roomId"], "workspace:42");
    assert_eq!(leave["data"]["status"], "offline");
    wait_for_state(&mut states, ClientState::Disconnected).await;

    // A second close stays quiet
    client.close().await.unwrap();
    assert!(conn.try_recv_frame(Duration::from_millis(300)).await.is_none());
    assert_eq!(client.state(), ClientState::Disconnected);
}
