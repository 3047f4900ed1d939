//! Op payload definitions

use presence_core::MessageDraft;
use serde::{Deserialize, Serialize};

/// Payload for op 10 (Hello)
///
/// Sent by the server immediately after connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HelloPayload {
    /// Heartbeat interval in milliseconds
    pub heartbeat_interval: u64,
}

impl HelloPayload {
    pub const DEFAULT_HEARTBEAT_INTERVAL: u64 = 45_000;

    #[must_use]
    pub fn with_interval(heartbeat_interval: u64) -> Self {
        Self { heartbeat_interval }
    }
}

impl Default for HelloPayload {
    fn default() -> Self {
        Self::with_interval(Self::DEFAULT_HEARTBEAT_INTERVAL)
    }
}

/// Payload for op 2 (Identify)
///
/// The user id comes from the external identity provider and is trusted as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentifyPayload {
    pub user_id: String,
}

/// Payload for op 3 (Activity Update)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityUpdatePayload {
    pub activity: String,
}

/// Payload for op 4 (Send Message)
///
/// `senderId` may be omitted, in which case the identified user is the sender.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessagePayload {
    #[serde(default)]
    pub receiver_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_id: Option<String>,
    #[serde(default)]
    pub content: String,
}

impl SendMessagePayload {
    /// Build the relay draft, falling back to `identified_user` as sender
    #[must_use]
    pub fn into_draft(self, identified_user: &str) -> MessageDraft {
        let sender_id = self
            .sender_id
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| identified_user.to_string());

        MessageDraft {
            sender_id,
            receiver_id: self.receiver_id,
            content: self.content,
        }
    }
}
