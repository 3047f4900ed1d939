//! WebSocket handler
//!
//! Handles WebSocket connections and message processing.

use crate::connection::{Connection, ConnectionState, Outbound};
use crate::handlers::MessageDispatcher;
use crate::protocol::{CloseCode, GatewayMessage, HelloPayload};
use crate::server::GatewayState;
use axum::{
    extract::{
        ws::{CloseFrame, Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use uuid::Uuid;

/// How long the writer gets to flush a close frame
const CLOSE_FLUSH_TIMEOUT: Duration = Duration::from_secs(1);

/// WebSocket gateway handler
pub async fn gateway_handler(
    State(state): State<GatewayState>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(state, socket))
}

/// Handle an upgraded WebSocket connection
async fn handle_socket(state: GatewayState, socket: WebSocket) {
    let session_id = Uuid::new_v4().to_string();
    let gateway_config = state.config().gateway.clone();

    // Create message channel for outgoing messages
    let (tx, mut rx) = mpsc::channel::<Outbound>(gateway_config.message_buffer.max(1));

    let connection = state
        .connection_manager()
        .add_connection(session_id.clone(), tx);

    tracing::info!(session_id = %session_id, "WebSocket connection established");

    let (mut ws_sink, mut ws_stream) = socket.split();

    // Send Hello message immediately
    let hello = GatewayMessage::hello(HelloPayload::with_interval(
        gateway_config.heartbeat_interval_ms,
    ));
    let hello_sent = match hello.to_json() {
        Ok(json) => ws_sink.send(Message::Text(json)).await.is_ok(),
        Err(_) => false,
    };
    if !hello_sent {
        tracing::warn!(session_id = %session_id, "Failed to send Hello message");
        cleanup_connection(&state, &connection);
        return;
    }

    let state_recv = state.clone();
    let connection_recv = connection.clone();

    // Receive frames until the client leaves or breaks protocol
    let mut recv_task = tokio::spawn(async move {
        let session_id = connection_recv.session_id().to_string();

        while let Some(msg) = ws_stream.next().await {
            match msg {
                Ok(Message::Text(text)) => {
                    if let Err(close_code) =
                        handle_text_message(&state_recv, &connection_recv, &text).await
                    {
                        return Some(close_code);
                    }
                }
                Ok(Message::Binary(_)) => {
                    tracing::debug!(session_id = %session_id, "Binary messages not supported");
                    return Some(CloseCode::DecodeError);
                }
                Ok(Message::Ping(_) | Message::Pong(_)) => {
                    tracing::trace!(session_id = %session_id, "Ping/pong received");
                }
                Ok(Message::Close(_)) => {
                    tracing::info!(session_id = %session_id, "Client closed connection");
                    return None;
                }
                Err(e) => {
                    tracing::warn!(session_id = %session_id, error = %e, "WebSocket error");
                    return None;
                }
            }
        }
        None
    });

    let session_id_send = session_id.clone();

    // Drain the outbound queue into the socket
    let mut send_task = tokio::spawn(async move {
        while let Some(item) = rx.recv().await {
            match item {
                Outbound::Message(msg) => {
                    let Ok(json) = msg.to_json() else {
                        continue;
                    };
                    if ws_sink.send(Message::Text(json)).await.is_err() {
                        tracing::warn!(
                            session_id = %session_id_send,
                            "Failed to send message to WebSocket"
                        );
                        break;
                    }
                }
                Outbound::Close(code) => {
                    let frame = CloseFrame {
                        code: code.as_u16(),
                        reason: code.description().into(),
                    };
                    let _ = ws_sink.send(Message::Close(Some(frame))).await;
                    break;
                }
            }
        }

        let _ = ws_sink.close().await;
    });

    let connection_identify = connection.clone();
    let identify_timeout = gateway_config.identify_timeout();

    // Close connections that never identify
    let mut identify_task = tokio::spawn(async move {
        tokio::time::sleep(identify_timeout).await;
        if connection_identify.state() == ConnectionState::Connecting {
            Some(CloseCode::IdentifyTimeout)
        } else {
            std::future::pending::<Option<CloseCode>>().await
        }
    });

    let mut send_done = false;
    let close_code = tokio::select! {
        result = &mut recv_task => result.ok().flatten(),
        _ = &mut send_task => {
            send_done = true;
            None
        }
        result = &mut identify_task => result.ok().flatten(),
    };

    recv_task.abort();
    identify_task.abort();

    if !send_done {
        if let Some(code) = close_code {
            tracing::debug!(session_id = %session_id, close_code = %code, "Closing connection");
            if connection.close(code).is_ok() {
                let _ = tokio::time::timeout(CLOSE_FLUSH_TIMEOUT, &mut send_task).await;
            }
        }
        send_task.abort();
    }

    cleanup_connection(&state, &connection);
}

/// Handle a text message from the client
async fn handle_text_message(
    state: &GatewayState,
    connection: &Arc<Connection>,
    text: &str,
) -> Result<(), CloseCode> {
    let message = GatewayMessage::parse(text).map_err(|e| {
        tracing::debug!(
            session_id = %connection.session_id(),
            error = %e,
            "Failed to parse message"
        );
        e.close_code()
    })?;

    tracing::trace!(
        session_id = %connection.session_id(),
        op = %message.op,
        "Received message"
    );

    match MessageDispatcher::dispatch(state, connection, message).await {
        Ok(Some(close_code)) => Err(close_code),
        Ok(None) => Ok(()),
        Err(e) => {
            tracing::warn!(
                session_id = %connection.session_id(),
                error = %e,
                "Handler error"
            );
            Err(e.to_close_code())
        }
    }
}

/// Clean up a connection on disconnect
///
/// The user goes offline only when no other Open connection of theirs remains.
fn cleanup_connection(state: &GatewayState, connection: &Arc<Connection>) {
    let session_id = connection.session_id();
    tracing::info!(session_id = %session_id, "Cleaning up connection");

    connection.set_state(ConnectionState::Closed);
    state.connection_manager().remove_connection(session_id);

    let Some(user_id) = connection.user_id() else {
        return;
    };

    if state.connection_manager().has_open_connection(user_id.as_str()) {
        tracing::debug!(user_id = %user_id, "User still has open connections");
        return;
    }

    if let Err(e) = state.service_context().presence().disconnect(user_id.as_str()) {
        tracing::warn!(user_id = %user_id, error = %e, "Failed to mark user offline");
    }
}
