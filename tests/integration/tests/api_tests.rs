//! Fallback route integration tests
//!
//! Each test starts its own in-memory server on an ephemeral port.
//!
//! Run with: cargo test -p integration-tests --test api_tests

use integration_tests::{
    assert_json, assert_status, ErrorBody, HealthBody, ProbeBody, SentBody, SnapshotBody,
    SuccessBody, TestServer,
};
use reqwest::StatusCode;
use serde_json::json;

// ============================================================================
// Health and probes
// ============================================================================

#[tokio::test]
async fn test_health_check() {
    let server = TestServer::start().await.expect("Failed to start server");

    let response = server.get("/health").await.unwrap();
    let health: HealthBody = assert_json(response, StatusCode::OK).await.unwrap();

    assert_eq!(health.status, "ok");
    assert!(!health.version.is_empty());
}

#[tokio::test]
async fn test_socket_io_probe() {
    let server = TestServer::start().await.unwrap();

    for path in ["/socket.io/?EIO=4&transport=polling", "/socket.io/anything/here"] {
        let response = server.get(path).await.unwrap();
        let probe: ProbeBody = assert_json(response, StatusCode::OK).await.unwrap();

        assert!(probe.sid.starts_with("fallback-session-"));
        assert!(probe.upgrades.is_empty());
        assert_eq!(probe.ping_interval, 25_000);
        assert_eq!(probe.ping_timeout, 60_000);
    }

    let response = server.post("/socket.io/", &json!({})).await.unwrap();
    assert_status(response, StatusCode::OK).await.unwrap();
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let server = TestServer::start().await.unwrap();

    let response = server.get("/api/tracks").await.unwrap();
    let body: ErrorBody = assert_json(response, StatusCode::NOT_FOUND).await.unwrap();
    assert_eq!(body.message, "WebSocket endpoint not found");
}

// ============================================================================
// Presence
// ============================================================================

#[tokio::test]
async fn test_connect_returns_snapshot() {
    let server = TestServer::start().await.unwrap();

    let response = server.post("/websocket/connect", &json!({"userId": "A"})).await.unwrap();
    let snapshot: SnapshotBody = assert_json(response, StatusCode::OK).await.unwrap();

    assert_eq!(snapshot.success, Some(true));
    assert_eq!(snapshot.online_users, vec!["A".to_string()]);
    assert_eq!(snapshot.activity_of("A"), Some("Idle"));
    assert_eq!(snapshot.revision, 1);
}

#[tokio::test]
async fn test_connect_then_disconnect_removes_user() {
    let server = TestServer::start().await.unwrap();

    server.post("/websocket/connect", &json!({"userId": "A"})).await.unwrap();
    server.post("/websocket/connect", &json!({"userId": "B"})).await.unwrap();

    let response = server.post("/websocket/disconnect", &json!({"userId": "A"})).await.unwrap();
    let ack: SuccessBody = assert_json(response, StatusCode::OK).await.unwrap();
    assert!(ack.success);

    let response = server.get("/websocket/users").await.unwrap();
    let snapshot: SnapshotBody = assert_json(response, StatusCode::OK).await.unwrap();
    assert_eq!(snapshot.online_users, vec!["B".to_string()]);
    assert_eq!(snapshot.success, None);
}

#[tokio::test]
async fn test_disconnect_absent_user_is_noop() {
    let server = TestServer::start().await.unwrap();

    let response = server.post("/websocket/disconnect", &json!({"userId": "ghost"})).await.unwrap();
    assert_status(response, StatusCode::OK).await.unwrap();

    let response = server.get("/websocket/users").await.unwrap();
    let snapshot: SnapshotBody = assert_json(response, StatusCode::OK).await.unwrap();
    assert!(snapshot.online_users.is_empty());
    assert_eq!(snapshot.revision, 0);
}

#[tokio::test]
async fn test_double_connect_resets_activity() {
    let server = TestServer::start().await.unwrap();

    server.post("/websocket/connect", &json!({"userId": "A"})).await.unwrap();
    server
        .post("/websocket/activity", &json!({"userId": "A", "activity": "Listening to Song X"}))
        .await
        .unwrap();

    let response = server.post("/websocket/connect", &json!({"userId": "A"})).await.unwrap();
    let snapshot: SnapshotBody = assert_json(response, StatusCode::OK).await.unwrap();

    assert_eq!(snapshot.online_users, vec!["A".to_string()]);
    assert_eq!(snapshot.activity_of("A"), Some("Idle"));
}

#[tokio::test]
async fn test_activity_update() {
    let server = TestServer::start().await.unwrap();
    server.post("/websocket/connect", &json!({"userId": "A"})).await.unwrap();

    let response = server
        .post("/websocket/activity", &json!({"userId": "A", "activity": "Listening to Song X"}))
        .await
        .unwrap();
    assert_status(response, StatusCode::OK).await.unwrap();

    let response = server.get("/websocket/users").await.unwrap();
    let snapshot: SnapshotBody = assert_json(response, StatusCode::OK).await.unwrap();
    assert_eq!(snapshot.activity_of("A"), Some("Listening to Song X"));
}

#[tokio::test]
async fn test_activity_for_absent_user_is_ignored() {
    let server = TestServer::start().await.unwrap();

    let response = server
        .post("/websocket/activity", &json!({"userId": "ghost", "activity": "Playing"}))
        .await
        .unwrap();
    let ack: SuccessBody = assert_json(response, StatusCode::OK).await.unwrap();
    assert!(ack.success);

    let response = server.get("/websocket/users").await.unwrap();
    let snapshot: SnapshotBody = assert_json(response, StatusCode::OK).await.unwrap();
    assert!(snapshot.online_users.is_empty());
}

#[tokio::test]
async fn test_connect_without_user_is_400() {
    let server = TestServer::start().await.unwrap();

    let response = server.post("/websocket/connect", &json!({})).await.unwrap();
    let body: ErrorBody = assert_json(response, StatusCode::BAD_REQUEST).await.unwrap();
    assert_eq!(body.code.as_deref(), Some("VALIDATION_ERROR"));

    let response = server
        .post_raw("/websocket/connect", "application/json", "{not json")
        .await
        .unwrap();
    assert_status(response, StatusCode::BAD_REQUEST).await.unwrap();
}

// ============================================================================
// Messages
// ============================================================================

#[tokio::test]
async fn test_send_message_round_trip() {
    let server = TestServer::start().await.unwrap();

    let response = server
        .post(
            "/websocket/message",
            &json!({"senderId": "A", "receiverId": "B", "content": "  hi there  "}),
        )
        .await
        .unwrap();
    let sent: SentBody = assert_json(response, StatusCode::OK).await.unwrap();

    assert!(sent.success);
    assert_eq!(sent.message.content, "  hi there  ");
    assert_eq!(sent.message.sender_id.as_str(), "A");
    assert_eq!(sent.message.receiver_id.as_str(), "B");

    let response = server.get("/websocket/messages/B/A").await.unwrap();
    let log: Vec<presence_core::Message> = assert_json(response, StatusCode::OK).await.unwrap();
    assert_eq!(log, vec![sent.message]);
}

#[tokio::test]
async fn test_conversation_keeps_insertion_order() {
    let server = TestServer::start().await.unwrap();

    for (from, to, content) in [("A", "B", "one"), ("B", "A", "two"), ("A", "C", "other"), ("A", "B", "three")] {
        let response = server
            .post(
                "/websocket/message",
                &json!({"senderId": from, "receiverId": to, "content": content}),
            )
            .await
            .unwrap();
        assert_status(response, StatusCode::OK).await.unwrap();
    }

    let response = server.get("/websocket/messages/A/B").await.unwrap();
    let log: Vec<presence_core::Message> = assert_json(response, StatusCode::OK).await.unwrap();
    let contents: Vec<&str> = log.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(contents, ["one", "two", "three"]);
}

#[tokio::test]
async fn test_send_message_missing_fields_is_400() {
    let server = TestServer::start().await.unwrap();

    for body in [
        json!({"receiverId": "B", "content": "hi"}),
        json!({"senderId": "A", "content": "hi"}),
        json!({"senderId": "A", "receiverId": "B"}),
        json!({"senderId": "A", "receiverId": "B", "content": ""}),
    ] {
        let response = server.post("/websocket/message", &body).await.unwrap();
        let error: ErrorBody = assert_json(response, StatusCode::BAD_REQUEST).await.unwrap();
        assert_eq!(error.code.as_deref(), Some("VALIDATION_ERROR"), "{body}");
    }

    let response = server.get("/websocket/messages/A/B").await.unwrap();
    let log: Vec<presence_core::Message> = assert_json(response, StatusCode::OK).await.unwrap();
    assert!(log.is_empty());
}
