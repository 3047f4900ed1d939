//! Client reconciler end-to-end tests
//!
//! Run with: cargo test -p integration-tests --test client_tests

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use integration_tests::{
    assert_json, eventually, wait_for_state, DelayedGateway, SnapshotBody, StalledGateway, TestServer,
};
use presence_api::AppState;
use presence_client::{ClientConfig, ConnectionMode, Reconciler};
use presence_common::AppConfig;
use presence_core::traits::{MessageRepository, RepoResult};
use presence_core::{DomainError, Message, MessageDraft, PresenceSnapshot};
use presence_service::ServiceContextBuilder;
use reqwest::StatusCode;

const HANDSHAKE_TIMEOUT: Duration = Duration::from_millis(300);
const POLL_INTERVAL: Duration = Duration::from_millis(100);

async fn server_snapshot(server: &TestServer) -> SnapshotBody {
    let response = server.get("/websocket/users").await.unwrap();
    assert_json(response, StatusCode::OK).await.unwrap()
}

async fn push_client(server: &TestServer, user_id: &str) -> Reconciler {
    let client = Reconciler::new(server.client_config()).unwrap();
    assert_eq!(client.connect(user_id).await.unwrap(), ConnectionMode::Push);
    client
}

async fn server_conversation(server: &TestServer, a: &str, b: &str) -> Vec<Message> {
    let response = server.get(&format!("/websocket/messages/{a}/{b}")).await.unwrap();
    assert_json(response, StatusCode::OK).await.unwrap()
}

/// Short timers, gateway reached through `gateway_url`
fn quick_config(server: &TestServer, gateway_url: String) -> ClientConfig {
    server
        .client_config()
        .with_gateway_url(gateway_url)
        .with_handshake_timeout(HANDSHAKE_TIMEOUT)
        .with_poll_interval(POLL_INTERVAL)
}

struct OfflineRepo;

#[async_trait]
impl MessageRepository for OfflineRepo {
    async fn create(&self, _draft: &MessageDraft) -> RepoResult<Message> {
        Err(DomainError::Persistence("document store unavailable".into()))
    }

    async fn count(&self) -> RepoResult<usize> {
        Ok(0)
    }
}

/// A client whose gateway never completes the handshake
async fn fallback_client(server: &TestServer, stalled: &StalledGateway, user_id: &str) -> Reconciler {
    let client = Reconciler::new(quick_config(server, stalled.url())).unwrap();
    assert_eq!(client.connect(user_id).await.unwrap(), ConnectionMode::Fallback);
    client
}

#[tokio::test]
async fn test_two_clients_see_each_other() {
    let server = TestServer::start().await.unwrap();

    let a = push_client(&server, "A").await;
    let snapshot = server_snapshot(&server).await;
    assert_eq!(snapshot.online_users, vec!["A".to_string()]);
    assert_eq!(snapshot.activities, vec![("A".to_string(), "Idle".to_string())]);

    let b = push_client(&server, "B").await;

    let mut a_rx = a.subscribe();
    let mut b_rx = b.subscribe();
    for rx in [&mut a_rx, &mut b_rx] {
        let state = wait_for_state(rx, |s| s.is_online("A") && s.is_online("B"))
            .await
            .unwrap();
        assert_eq!(state.online_users.len(), 2);
        assert_eq!(state.connection_mode, ConnectionMode::Push);
    }

    a.disconnect().await;
    b.disconnect().await;
}

#[tokio::test]
async fn test_fallback_send_appends_immediately() {
    let server = TestServer::start().await.unwrap();
    let stalled = StalledGateway::start().await.unwrap();

    let c = fallback_client(&server, &stalled, "C").await;
    assert_eq!(c.state().connection_mode, ConnectionMode::Fallback);
    assert!(server_snapshot(&server).await.online_users.contains(&"C".to_string()));

    let message = c.send_message("D", "hi").await.unwrap().expect("fallback returns the message");
    assert_eq!(message.content, "hi");
    assert_eq!(message.sender_id.as_str(), "C");
    assert_eq!(message.receiver_id.as_str(), "D");

    let state = c.state();
    assert_eq!(state.messages, vec![message]);

    c.disconnect().await;
    assert!(server_snapshot(&server).await.online_users.is_empty());
}

#[tokio::test]
async fn test_activity_reaches_other_client() {
    let server = TestServer::start().await.unwrap();
    let a = push_client(&server, "A").await;
    let b = push_client(&server, "B").await;

    a.update_activity("Listening — Song X").await;

    let mut b_rx = b.subscribe();
    let state = wait_for_state(&mut b_rx, |s| s.activity_of("A") == Some("Listening — Song X"))
        .await
        .unwrap();
    assert!(state.is_online("A"));

    a.disconnect().await;
    b.disconnect().await;
}

#[tokio::test]
async fn test_stale_snapshot_does_not_resurrect_user() {
    let server = TestServer::start().await.unwrap();
    let a = push_client(&server, "A").await;
    let b = push_client(&server, "B").await;

    let mut a_rx = a.subscribe();
    wait_for_state(&mut a_rx, |s| s.is_online("B")).await.unwrap();

    let response = server.get("/websocket/users").await.unwrap();
    let stale: PresenceSnapshot = assert_json(response, StatusCode::OK).await.unwrap();
    assert!(stale.contains("B"));

    b.disconnect().await;
    wait_for_state(&mut a_rx, |s| !s.is_online("B")).await.unwrap();

    a.store().apply_snapshot(&stale);
    assert!(!a.state().is_online("B"));
    assert!(a.state().is_online("A"));

    a.disconnect().await;
}

#[tokio::test]
async fn test_fallback_client_polls_presence() {
    let server = TestServer::start().await.unwrap();
    let stalled = StalledGateway::start().await.unwrap();

    let c = fallback_client(&server, &stalled, "C").await;
    let a = push_client(&server, "A").await;

    let mut c_rx = c.subscribe();
    wait_for_state(&mut c_rx, |s| s.is_online("A") && s.is_online("C"))
        .await
        .unwrap();

    a.update_activity("Playing").await;
    wait_for_state(&mut c_rx, |s| s.activity_of("A") == Some("Playing"))
        .await
        .unwrap();

    a.disconnect().await;
    wait_for_state(&mut c_rx, |s| !s.is_online("A")).await.unwrap();

    c.disconnect().await;
}

#[tokio::test]
async fn test_push_message_delivery() {
    let server = TestServer::start().await.unwrap();
    let a = push_client(&server, "A").await;
    let b = push_client(&server, "B").await;

    assert!(a.send_message("B", "over push").await.unwrap().is_none());

    let mut b_rx = b.subscribe();
    let state = wait_for_state(&mut b_rx, |s| !s.messages.is_empty()).await.unwrap();
    assert_eq!(state.messages[0].content, "over push");

    let mut a_rx = a.subscribe();
    let echoed = wait_for_state(&mut a_rx, |s| !s.messages.is_empty()).await.unwrap();
    assert_eq!(echoed.messages[0].id, state.messages[0].id);

    a.disconnect().await;
    b.disconnect().await;
}

#[tokio::test]
async fn test_fetch_messages_replaces_list() {
    let server = TestServer::start().await.unwrap();
    let stalled = StalledGateway::start().await.unwrap();
    let c = fallback_client(&server, &stalled, "C").await;

    c.send_message("D", "one").await.unwrap();
    c.send_message("E", "elsewhere").await.unwrap();
    c.send_message("D", "two").await.unwrap();
    assert_eq!(c.state().messages.len(), 3);

    let log = c.fetch_messages("D").await.unwrap();
    let contents: Vec<&str> = log.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(contents, ["one", "two"]);
    assert_eq!(c.state().messages, log);

    c.disconnect().await;
}

#[tokio::test]
async fn test_invalid_send_is_rejected_locally() {
    let server = TestServer::start().await.unwrap();
    let a = push_client(&server, "A").await;

    assert!(a.send_message("B", "").await.unwrap_err().is_validation());
    assert!(a.send_message(" ", "hi").await.unwrap_err().is_validation());

    a.disconnect().await;
}

#[tokio::test]
async fn test_get_online_users_merges_snapshot() {
    let server = TestServer::start().await.unwrap();
    let a = push_client(&server, "A").await;

    server
        .post("/websocket/connect", &serde_json::json!({"userId": "Z"}))
        .await
        .unwrap();

    let snapshot = a.get_online_users().await.unwrap();
    assert!(snapshot.contains("Z"));
    assert!(a.state().is_online("Z"));

    a.disconnect().await;
}

#[tokio::test]
async fn test_disconnect_stops_all_session_work() {
    let server = TestServer::start().await.unwrap();
    let stalled = StalledGateway::start().await.unwrap();
    let c = fallback_client(&server, &stalled, "C").await;

    c.disconnect().await;

    let state = c.state();
    assert_eq!(state.connection_mode, ConnectionMode::Disconnected);
    assert!(state.online_users.is_empty());

    server
        .post("/websocket/connect", &serde_json::json!({"userId": "late"}))
        .await
        .unwrap();
    tokio::time::sleep(POLL_INTERVAL * 4).await;
    assert_eq!(c.state(), state);

    let server = &server;
    eventually(move || async move {
        Ok(!server_snapshot(server).await.online_users.contains(&"C".to_string()))
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn test_reconnect_replaces_session() {
    let server = TestServer::start().await.unwrap();
    let client = push_client(&server, "A").await;

    assert_eq!(client.connect("A2").await.unwrap(), ConnectionMode::Push);

    let server = &server;
    eventually(move || async move {
        Ok(server_snapshot(server).await.online_users == vec!["A2".to_string()])
    })
    .await
    .unwrap();

    client.disconnect().await;
}

#[tokio::test]
async fn test_unconfirmed_push_sends_over_fallback() {
    let server = TestServer::start().await.unwrap();
    // Identify never reaches the server while the test runs
    let gateway = DelayedGateway::start(server.gateway_url(), Duration::from_secs(60))
        .await
        .unwrap();

    let a = Reconciler::new(quick_config(&server, gateway.url())).unwrap();
    assert_eq!(a.connect("A").await.unwrap(), ConnectionMode::Fallback);

    let message = a
        .send_message("B", "while pending")
        .await
        .unwrap()
        .expect("fallback returns the message");
    assert_eq!(a.state().messages, vec![message.clone()]);
    assert_eq!(server_conversation(&server, "A", "B").await, vec![message]);

    a.update_activity("Playing").await;
    assert_eq!(server_snapshot(&server).await.activity_of("A"), Some("Playing"));

    a.disconnect().await;
}

#[tokio::test]
async fn test_late_push_confirmation_takes_over() {
    let server = TestServer::start().await.unwrap();
    let gateway = DelayedGateway::start(server.gateway_url(), HANDSHAKE_TIMEOUT * 2)
        .await
        .unwrap();

    let a = Reconciler::new(quick_config(&server, gateway.url())).unwrap();
    assert_eq!(a.connect("A").await.unwrap(), ConnectionMode::Fallback);

    let mut a_rx = a.subscribe();
    let state = wait_for_state(&mut a_rx, |s| s.connection_mode == ConnectionMode::Push)
        .await
        .unwrap();
    assert!(state.is_online("A"));

    assert!(a.send_message("B", "over push").await.unwrap().is_none());
    let state = wait_for_state(&mut a_rx, |s| !s.messages.is_empty()).await.unwrap();
    assert_eq!(state.messages[0].content, "over push");

    a.disconnect().await;
}

#[tokio::test]
async fn test_lost_push_connection_activates_fallback() {
    let server = TestServer::start().await.unwrap();
    let a = Reconciler::new(quick_config(&server, server.gateway_url())).unwrap();
    assert_eq!(a.connect("A").await.unwrap(), ConnectionMode::Push);

    assert_eq!(server.close_gateway_sessions("A"), 1);

    let mut a_rx = a.subscribe();
    wait_for_state(&mut a_rx, |s| s.connection_mode == ConnectionMode::Fallback)
        .await
        .unwrap();

    let server_ref = &server;
    eventually(move || async move {
        Ok(server_snapshot(server_ref).await.online_users.contains(&"A".to_string()))
    })
    .await
    .unwrap();

    server
        .post("/websocket/connect", &serde_json::json!({"userId": "Z"}))
        .await
        .unwrap();
    let state = wait_for_state(&mut a_rx, |s| s.is_online("Z")).await.unwrap();
    assert!(state.is_online("A"));
    assert_eq!(state.connection_mode, ConnectionMode::Fallback);

    a.disconnect().await;
}

#[tokio::test]
async fn test_polling_and_push_converge_without_resurrection() {
    let server = TestServer::start().await.unwrap();
    let gateway = DelayedGateway::start(server.gateway_url(), HANDSHAKE_TIMEOUT * 2)
        .await
        .unwrap();

    let config = quick_config(&server, gateway.url()).with_poll_interval(Duration::from_millis(20));
    let a = Reconciler::new(config).unwrap();
    assert_eq!(a.connect("A").await.unwrap(), ConnectionMode::Fallback);

    let mut a_rx = a.subscribe();
    wait_for_state(&mut a_rx, |s| s.connection_mode == ConnectionMode::Push)
        .await
        .unwrap();

    let b = push_client(&server, "B").await;
    wait_for_state(&mut a_rx, |s| s.is_online("B")).await.unwrap();

    b.disconnect().await;
    wait_for_state(&mut a_rx, |s| !s.is_online("B")).await.unwrap();

    // Polls keep landing next to the push stream; none of them may bring B back
    for _ in 0..10 {
        tokio::time::sleep(Duration::from_millis(20)).await;
        let state = a.state();
        assert!(!state.is_online("B"));
        assert!(state.is_online("A"));
    }
    assert_eq!(a.connection_mode(), ConnectionMode::Push);

    a.disconnect().await;
}

#[tokio::test]
async fn test_rejected_push_send_is_reported() {
    let context = ServiceContextBuilder::new()
        .message_repo(Arc::new(OfflineRepo))
        .build();
    let server = TestServer::start_with_state(AppState::new(context, AppConfig::default()))
        .await
        .unwrap();
    let a = push_client(&server, "A").await;

    assert!(a.send_message("B", "hi").await.unwrap().is_none());

    let mut a_rx = a.subscribe();
    let state = wait_for_state(&mut a_rx, |s| s.last_send_error.is_some())
        .await
        .unwrap();
    let failure = state.last_send_error.unwrap();
    assert_eq!(failure.code, "PERSISTENCE_ERROR");
    assert!(failure.message.contains("document store unavailable"));
    assert!(state.messages.is_empty());
    assert_eq!(state.connection_mode, ConnectionMode::Push);

    a.disconnect().await;
}
