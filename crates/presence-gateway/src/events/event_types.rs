//! Gateway event types
//!
//! Defines all event type names for dispatch messages.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::protocol::GatewayMessage;

/// Gateway event types
///
/// These are the event names sent in the `t` field of dispatch messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatewayEventType {
    // Presence events
    /// Full list of online user ids
    UsersOnline,
    /// Full list of `[userId, activity]` pairs
    Activities,
    /// A user came online
    UserConnected,
    /// A user went offline
    UserDisconnected,
    /// A user's activity changed
    ActivityUpdated,

    // Message events
    /// Message addressed to this user
    ReceiveMessage,
    /// Echo of a message this user sent
    MessageSent,
    /// A send over this connection was rejected
    MessageError,
}

impl GatewayEventType {
    /// Get the string representation of the event type
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::UsersOnline => "users_online",
            Self::Activities => "activities",
            Self::UserConnected => "user_connected",
            Self::UserDisconnected => "user_disconnected",
            Self::ActivityUpdated => "activity_updated",
            Self::ReceiveMessage => "receive_message",
            Self::MessageSent => "message_sent",
            Self::MessageError => "message_error",
        }
    }

    /// Parse an event type from a string
    #[must_use]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "users_online" => Some(Self::UsersOnline),
            "activities" => Some(Self::Activities),
            "user_connected" => Some(Self::UserConnected),
            "user_disconnected" => Some(Self::UserDisconnected),
            "activity_updated" => Some(Self::ActivityUpdated),
            "receive_message" => Some(Self::ReceiveMessage),
            "message_sent" => Some(Self::MessageSent),
            "message_error" => Some(Self::MessageError),
            _ => None,
        }
    }

    /// Check if this event reflects presence state and carries a revision
    #[must_use]
    pub const fn is_presence(self) -> bool {
        matches!(
            self,
            Self::UsersOnline
                | Self::Activities
                | Self::UserConnected
                | Self::UserDisconnected
                | Self::ActivityUpdated
        )
    }

    /// Build a dispatch frame for this event
    #[must_use]
    pub fn dispatch(self, data: serde_json::Value) -> GatewayMessage {
        GatewayMessage::dispatch(self.as_str(), data)
    }
}

impl fmt::Display for GatewayEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<GatewayEventType> for String {
    fn from(event: GatewayEventType) -> Self {
        event.as_str().to_string()
    }
}
