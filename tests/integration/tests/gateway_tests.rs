//! Gateway integration tests
//!
//! Drive `/gateway` with raw WebSocket frames.
//!
//! Run with: cargo test -p integration-tests --test gateway_tests

use integration_tests::{assert_json, eventually, SnapshotBody, TestServer};
use presence_common::AppConfig;
use presence_gateway::protocol::{GatewayMessage, OpCode};
use reqwest::StatusCode;
use serde_json::json;

async fn online_users(server: &TestServer) -> Vec<String> {
    let response = server.get("/websocket/users").await.unwrap();
    let snapshot: SnapshotBody = assert_json(response, StatusCode::OK).await.unwrap();
    snapshot.online_users
}

// ============================================================================
// Handshake
// ============================================================================

#[tokio::test]
async fn test_hello_then_identify_snapshot() {
    let server = TestServer::start().await.unwrap();
    let mut socket = server.gateway().await.unwrap();

    assert_eq!(socket.hello.heartbeat_interval, 45_000);

    let (users, activities) = socket.identify("A").await.unwrap();
    assert_eq!(users.d, Some(json!(["A"])));
    assert_eq!(users.rev, Some(1));
    assert_eq!(users.s, Some(1));
    assert_eq!(activities.d, Some(json!([["A", "Idle"]])));
    assert_eq!(activities.rev, Some(1));

    assert_eq!(online_users(&server).await, vec!["A".to_string()]);
}

#[tokio::test]
async fn test_heartbeat_is_acknowledged() {
    let server = TestServer::start().await.unwrap();
    let mut socket = server.gateway().await.unwrap();

    socket.send(&GatewayMessage::heartbeat()).await.unwrap();
    let ack = socket.next_message().await.unwrap();
    assert_eq!(ack.op, OpCode::HeartbeatAck);
}

#[tokio::test]
async fn test_new_user_is_broadcast_to_others() {
    let server = TestServer::start().await.unwrap();
    let mut a = server.gateway().await.unwrap();
    a.identify("A").await.unwrap();

    let mut b = server.gateway().await.unwrap();
    let (users, _) = b.identify("B").await.unwrap();
    assert_eq!(users.d, Some(json!(["A", "B"])));

    let connected = a.next_dispatch("user_connected").await.unwrap();
    assert_eq!(connected.d, Some(json!("B")));
    assert_eq!(connected.rev, Some(2));

    let users = a.next_dispatch("users_online").await.unwrap();
    assert_eq!(users.d, Some(json!(["A", "B"])));
    let activities = a.next_dispatch("activities").await.unwrap();
    assert_eq!(activities.d, Some(json!([["A", "Idle"], ["B", "Idle"]])));
}

// ============================================================================
// Protocol violations
// ============================================================================

#[tokio::test]
async fn test_malformed_frame_closes_with_decode_error() {
    let server = TestServer::start().await.unwrap();
    let mut socket = server.gateway().await.unwrap();

    socket.send_text("{not json").await.unwrap();
    assert_eq!(socket.expect_close().await.unwrap(), Some(4002));
}

#[tokio::test]
async fn test_unknown_opcode_closes() {
    let server = TestServer::start().await.unwrap();

    let mut socket = server.gateway().await.unwrap();
    socket.send_text(r#"{"op":9}"#).await.unwrap();
    assert_eq!(socket.expect_close().await.unwrap(), Some(4001));

    let mut socket = server.gateway().await.unwrap();
    socket.send(&GatewayMessage::heartbeat_ack()).await.unwrap();
    assert_eq!(socket.expect_close().await.unwrap(), Some(4001));
}

#[tokio::test]
async fn test_activity_before_identify_closes() {
    let server = TestServer::start().await.unwrap();
    let mut socket = server.gateway().await.unwrap();

    socket.send(&GatewayMessage::activity_update("Playing")).await.unwrap();
    assert_eq!(socket.expect_close().await.unwrap(), Some(4003));
}

#[tokio::test]
async fn test_second_identify_closes() {
    let server = TestServer::start().await.unwrap();
    let mut socket = server.gateway().await.unwrap();
    socket.identify("A").await.unwrap();

    socket.send(&GatewayMessage::identify("B")).await.unwrap();
    assert_eq!(socket.expect_close().await.unwrap(), Some(4005));

    eventually(|| async { Ok(online_users(&server).await.is_empty()) })
        .await
        .unwrap();
}

#[tokio::test]
async fn test_identify_timeout_closes() {
    let mut config = AppConfig::default();
    config.gateway.identify_timeout_ms = 200;
    let server = TestServer::start_with_config(config).await.unwrap();

    let mut socket = server.gateway().await.unwrap();
    assert_eq!(socket.expect_close().await.unwrap(), Some(4009));
}

// ============================================================================
// Disconnects
// ============================================================================

#[tokio::test]
async fn test_closing_socket_disconnects_user() {
    let server = TestServer::start().await.unwrap();
    let mut a = server.gateway().await.unwrap();
    a.identify("A").await.unwrap();
    let mut b = server.gateway().await.unwrap();
    b.identify("B").await.unwrap();

    b.close().await.unwrap();

    let left = a.next_dispatch("user_disconnected").await.unwrap();
    assert_eq!(left.d, Some(json!("B")));
    assert_eq!(left.rev, Some(3));
    assert_eq!(online_users(&server).await, vec!["A".to_string()]);
}

#[tokio::test]
async fn test_user_stays_online_while_another_socket_is_open() {
    let server = TestServer::start().await.unwrap();
    let mut first = server.gateway().await.unwrap();
    first.identify("A").await.unwrap();
    let mut second = server.gateway().await.unwrap();
    second.identify("A").await.unwrap();

    first.close().await.unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(200)).await;
    second.send(&GatewayMessage::heartbeat()).await.unwrap();
    assert_eq!(second.next_message().await.unwrap().op, OpCode::HeartbeatAck);
    assert_eq!(online_users(&server).await, vec!["A".to_string()]);

    second.close().await.unwrap();
    eventually(|| async { Ok(online_users(&server).await.is_empty()) })
        .await
        .unwrap();
}

// ============================================================================
// Messages and activity
// ============================================================================

#[tokio::test]
async fn test_message_delivery_and_echo() {
    let server = TestServer::start().await.unwrap();
    let mut a = server.gateway().await.unwrap();
    a.identify("A").await.unwrap();
    let mut b = server.gateway().await.unwrap();
    b.identify("B").await.unwrap();

    a.send_text(r#"{"op":4,"d":{"receiverId":"B","content":"hi"}}"#)
        .await
        .unwrap();

    let received = b.next_dispatch("receive_message").await.unwrap();
    let data = received.d.unwrap();
    assert_eq!(data["senderId"], "A");
    assert_eq!(data["content"], "hi");

    let echoed = a.next_dispatch("message_sent").await.unwrap();
    assert_eq!(echoed.d.unwrap()["id"], data["id"]);
}

#[tokio::test]
async fn test_rejected_message_keeps_socket_open() {
    let server = TestServer::start().await.unwrap();
    let mut a = server.gateway().await.unwrap();
    a.identify("A").await.unwrap();

    a.send_text(r#"{"op":4,"d":{"receiverId":"B","content":""}}"#)
        .await
        .unwrap();
    let error = a.next_dispatch("message_error").await.unwrap();
    assert_eq!(error.d.unwrap()["code"], "VALIDATION_ERROR");

    a.send(&GatewayMessage::heartbeat()).await.unwrap();
    assert_eq!(a.next_message().await.unwrap().op, OpCode::HeartbeatAck);
}

#[tokio::test]
async fn test_activity_update_is_broadcast() {
    let server = TestServer::start().await.unwrap();
    let mut a = server.gateway().await.unwrap();
    a.identify("A").await.unwrap();
    let mut b = server.gateway().await.unwrap();
    b.identify("B").await.unwrap();

    a.send(&GatewayMessage::activity_update("Listening to Song X"))
        .await
        .unwrap();

    let update = b.next_dispatch("activity_updated").await.unwrap();
    assert_eq!(update.d, Some(json!({"userId": "A", "activity": "Listening to Song X"})));
    assert_eq!(update.rev, Some(3));
}

#[tokio::test]
async fn test_fallback_changes_reach_push_clients() {
    let server = TestServer::start().await.unwrap();
    let mut a = server.gateway().await.unwrap();
    a.identify("A").await.unwrap();

    server.post("/websocket/connect", &json!({"userId": "C"})).await.unwrap();
    let connected = a.next_dispatch("user_connected").await.unwrap();
    assert_eq!(connected.d, Some(json!("C")));

    server
        .post("/websocket/activity", &json!({"userId": "C", "activity": "Browsing"}))
        .await
        .unwrap();
    let update = a.next_dispatch("activity_updated").await.unwrap();
    assert_eq!(update.d.unwrap()["activity"], "Browsing");

    server
        .post(
            "/websocket/message",
            &json!({"senderId": "C", "receiverId": "A", "content": "from fallback"}),
        )
        .await
        .unwrap();
    let received = a.next_dispatch("receive_message").await.unwrap();
    assert_eq!(received.d.unwrap()["content"], "from fallback");

    server.post("/websocket/disconnect", &json!({"userId": "C"})).await.unwrap();
    let left = a.next_dispatch("user_disconnected").await.unwrap();
    assert_eq!(left.d, Some(json!("C")));
}
