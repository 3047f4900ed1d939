//! Socket.IO probe and unmatched routes

use axum::{http::StatusCode, response::Response, Json};
use chrono::Utc;

use crate::dto::HandshakeProbeResponse;
use crate::response::MessageBody;

/// Answer Socket.IO handshake probes so clients that try Socket.IO first get a
/// well-formed reply with no transport upgrades
///
/// ANY /socket.io/*
pub async fn socket_io_probe() -> Json<HandshakeProbeResponse> {
    Json(HandshakeProbeResponse::new(Utc::now().timestamp_millis()))
}

/// 404 for everything else
pub async fn not_found() -> Response {
    MessageBody::new("WebSocket endpoint not found").into_response_with(StatusCode::NOT_FOUND)
}
