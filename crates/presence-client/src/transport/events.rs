//! Events reported by the transports

use crate::error::{ClientError, ClientResult};
use presence_core::{Message, PresenceSnapshot, UserId};
use presence_gateway::events::{ActivityUpdatedPayload, GatewayEventType, MessageErrorPayload};
use presence_gateway::protocol::GatewayMessage;
use serde::Serialize;
use std::fmt;

/// Transport an event or operation went through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    Push,
    Fallback,
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Push => f.write_str("push"),
            Self::Fallback => f.write_str("fallback"),
        }
    }
}

/// Something a transport learned from the server
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// `users_online` frame
    UsersOnline {
        users: Vec<UserId>,
        revision: Option<u64>,
    },
    /// `activities` frame
    Activities {
        activities: Vec<(UserId, String)>,
        revision: Option<u64>,
    },
    /// Full snapshot from a fallback request
    Snapshot(PresenceSnapshot),
    UserConnected {
        user_id: UserId,
        revision: Option<u64>,
    },
    UserDisconnected {
        user_id: UserId,
        revision: Option<u64>,
    },
    ActivityUpdated {
        user_id: UserId,
        activity: String,
        revision: Option<u64>,
    },
    /// Received or echoed message
    Message(Message),
    /// A push send was refused by the server
    MessageRejected { code: String, message: String },
    /// The push handshake completed
    PushConfirmed,
    /// The push socket went away
    PushClosed { code: Option<u16>, confirmed: bool },
}

impl TransportEvent {
    /// Decode a push dispatch frame
    ///
    /// Unknown event names yield `Ok(None)`.
    pub fn from_dispatch(frame: &GatewayMessage) -> ClientResult<Option<Self>> {
        let Some(name) = frame.t.as_deref() else {
            return Err(ClientError::Protocol("dispatch without event name".to_string()));
        };
        let Some(event_type) = GatewayEventType::from_str(name) else {
            tracing::debug!(event = name, "Ignoring unknown dispatch event");
            return Ok(None);
        };

        let revision = frame.rev;
        let decode_err = |e: serde_json::Error| ClientError::Protocol(format!("invalid {name} payload: {e}"));

        let event = match event_type {
            GatewayEventType::UsersOnline => Self::UsersOnline {
                users: frame.payload().map_err(decode_err)?,
                revision,
            },
            GatewayEventType::Activities => Self::Activities {
                activities: frame.payload().map_err(decode_err)?,
                revision,
            },
            GatewayEventType::UserConnected => Self::UserConnected {
                user_id: frame.payload().map_err(decode_err)?,
                revision,
            },
            GatewayEventType::UserDisconnected => Self::UserDisconnected {
                user_id: frame.payload().map_err(decode_err)?,
                revision,
            },
            GatewayEventType::ActivityUpdated => {
                let payload: ActivityUpdatedPayload = frame.payload().map_err(decode_err)?;
                Self::ActivityUpdated {
                    user_id: UserId::new(payload.user_id)?,
                    activity: payload.activity,
                    revision,
                }
            }
            GatewayEventType::ReceiveMessage | GatewayEventType::MessageSent => {
                Self::Message(frame.payload().map_err(decode_err)?)
            }
            GatewayEventType::MessageError => {
                let payload: MessageErrorPayload = frame.payload().map_err(decode_err)?;
                Self::MessageRejected {
                    code: payload.code,
                    message: payload.message,
                }
            }
        };

        Ok(Some(event))
    }

    /// Short name for logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UsersOnline { .. } => "users_online",
            Self::Activities { .. } => "activities",
            Self::Snapshot(_) => "snapshot",
            Self::UserConnected { .. } => "user_connected",
            Self::UserDisconnected { .. } => "user_disconnected",
            Self::ActivityUpdated { .. } => "activity_updated",
            Self::Message(_) => "message",
            Self::MessageRejected { .. } => "message_rejected",
            Self::PushConfirmed => "push_confirmed",
            Self::PushClosed { .. } => "push_closed",
        }
    }
}
