//! Presence events - emitted whenever presence or message state changes
//!
//! Both transports publish these onto the server's event bus. The push gateway
//! subscribes and fans them out to open connections.

use serde::{Deserialize, Serialize};

use crate::entities::{Message, PresenceSnapshot};
use crate::value_objects::UserId;

/// All events carried by the event bus
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PresenceEvent {
    /// A user came online; `snapshot` is the store state right after the connect
    UserConnected {
        user_id: UserId,
        snapshot: PresenceSnapshot,
        /// Push session that performed the connect, if any. That session has
        /// already been sent the snapshot and is skipped on fan-out.
        origin_session: Option<String>,
    },

    UserDisconnected {
        user_id: UserId,
        revision: u64,
    },

    ActivityUpdated {
        user_id: UserId,
        activity: String,
        revision: u64,
    },

    MessageCreated {
        message: Message,
    },
}

impl PresenceEvent {
    /// Presence revision carried by the event, if it is a presence change
    pub fn revision(&self) -> Option<u64> {
        match self {
            Self::UserConnected { snapshot, .. } => Some(snapshot.revision),
            Self::UserDisconnected { revision, .. } | Self::ActivityUpdated { revision, .. } => {
                Some(*revision)
            }
            Self::MessageCreated { .. } => None,
        }
    }

    /// Short name for logging
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UserConnected { .. } => "USER_CONNECTED",
            Self::UserDisconnected { .. } => "USER_DISCONNECTED",
            Self::ActivityUpdated { .. } => "ACTIVITY_UPDATED",
            Self::MessageCreated { .. } => "MESSAGE_CREATED",
        }
    }
}
