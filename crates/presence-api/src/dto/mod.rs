//! Request and response bodies for the fallback routes
//!
//! All bodies are camelCase JSON.

use presence_core::{Message, PresenceSnapshot};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Body of `connect` and `disconnect`
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UserRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "userId is required"))]
    pub user_id: String,
}

/// Body of `activity`
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ActivityRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "userId is required"))]
    pub user_id: String,
    pub activity: String,
}

/// `{success}`
#[derive(Debug, Clone, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

impl SuccessResponse {
    pub fn ok() -> Self {
        Self { success: true }
    }
}

/// `{success, onlineUsers, activities, revision}`
#[derive(Debug, Clone, Serialize)]
pub struct ConnectResponse {
    pub success: bool,
    #[serde(flatten)]
    pub snapshot: PresenceSnapshot,
}

/// `{success, message}`
#[derive(Debug, Clone, Serialize)]
pub struct SendMessageResponse {
    pub success: bool,
    pub message: Message,
}

/// Socket.IO handshake stand-in returned on `/socket.io/*`
///
/// Advertises no upgrades so Socket.IO clients stay on HTTP.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HandshakeProbeResponse {
    pub sid: String,
    pub upgrades: Vec<String>,
    pub ping_interval: u64,
    pub ping_timeout: u64,
}

impl HandshakeProbeResponse {
    pub const PING_INTERVAL_MS: u64 = 25_000;
    pub const PING_TIMEOUT_MS: u64 = 60_000;

    pub fn new(now_millis: i64) -> Self {
        Self {
            sid: format!("fallback-session-{now_millis}"),
            upgrades: Vec::new(),
            ping_interval: Self::PING_INTERVAL_MS,
            ping_timeout: Self::PING_TIMEOUT_MS,
        }
    }
}

/// Liveness probe body
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

impl HealthResponse {
    pub fn healthy() -> Self {
        Self {
            status: "ok",
            version: env!("CARGO_PKG_VERSION"),
        }
    }
}
