//! Gateway message format
//!
//! Defines the structure for all WebSocket messages.

use super::{
    ActivityUpdatePayload, CloseCode, HelloPayload, IdentifyPayload, OpCode, SendMessagePayload,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Why an inbound frame could not be turned into a [`GatewayMessage`]
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("Malformed frame: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Unknown op code: {0}")]
    UnknownOpcode(u8),
}

impl FrameError {
    /// Close code the connection is terminated with
    #[must_use]
    pub fn close_code(&self) -> CloseCode {
        match self {
            Self::Decode(_) => CloseCode::DecodeError,
            Self::UnknownOpcode(_) => CloseCode::UnknownOpcode,
        }
    }
}

/// Gateway message format
///
/// All messages sent over the WebSocket connection follow this format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayMessage {
    /// Operation code
    pub op: OpCode,

    /// Event type (only for op=0 Dispatch)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub t: Option<String>,

    /// Per-connection sequence number (only for op=0 Dispatch)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s: Option<u64>,

    /// Presence revision the event reflects (presence dispatches only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rev: Option<u64>,

    /// Event data payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub d: Option<Value>,
}

/// Wire shape before the op code is checked
#[derive(Deserialize)]
struct RawFrame {
    op: u8,
    #[serde(default)]
    t: Option<String>,
    #[serde(default)]
    s: Option<u64>,
    #[serde(default)]
    rev: Option<u64>,
    #[serde(default)]
    d: Option<Value>,
}

impl GatewayMessage {
    const fn bare(op: OpCode) -> Self {
        Self {
            op,
            t: None,
            s: None,
            rev: None,
            d: None,
        }
    }

    // === Server Messages ===

    /// Create a Dispatch message (op=0)
    ///
    /// The sequence number is stamped by the connection when it is queued.
    #[must_use]
    pub fn dispatch(event_type: impl Into<String>, data: Value) -> Self {
        Self {
            t: Some(event_type.into()),
            d: Some(data),
            ..Self::bare(OpCode::Dispatch)
        }
    }

    /// Attach the presence revision this dispatch reflects
    #[must_use]
    pub fn with_revision(mut self, revision: u64) -> Self {
        self.rev = Some(revision);
        self
    }

    /// Set the sequence number
    #[must_use]
    pub fn with_sequence(mut self, sequence: u64) -> Self {
        self.s = Some(sequence);
        self
    }

    /// Create a Hello message (op=10)
    #[must_use]
    pub fn hello(payload: HelloPayload) -> Self {
        Self {
            d: serde_json::to_value(payload).ok(),
            ..Self::bare(OpCode::Hello)
        }
    }

    /// Create a Heartbeat ACK message (op=11)
    #[must_use]
    pub fn heartbeat_ack() -> Self {
        Self::bare(OpCode::HeartbeatAck)
    }

    // === Client Messages ===

    /// Create a Heartbeat message (op=1)
    #[must_use]
    pub fn heartbeat() -> Self {
        Self::bare(OpCode::Heartbeat)
    }

    /// Create an Identify message (op=2)
    #[must_use]
    pub fn identify(user_id: impl Into<String>) -> Self {
        Self::with_payload(
            OpCode::Identify,
            &IdentifyPayload {
                user_id: user_id.into(),
            },
        )
    }

    /// Create an Activity Update message (op=3)
    #[must_use]
    pub fn activity_update(activity: impl Into<String>) -> Self {
        Self::with_payload(
            OpCode::ActivityUpdate,
            &ActivityUpdatePayload {
                activity: activity.into(),
            },
        )
    }

    /// Create a Send Message message (op=4)
    #[must_use]
    pub fn send_message(payload: &SendMessagePayload) -> Self {
        Self::with_payload(OpCode::SendMessage, payload)
    }

    fn with_payload<T: Serialize>(op: OpCode, payload: &T) -> Self {
        Self {
            d: serde_json::to_value(payload).ok(),
            ..Self::bare(op)
        }
    }

    // === Parsing ===

    /// Decode the `d` field into a typed payload
    ///
    /// A missing `d` is treated as `null`.
    pub fn payload<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.d.clone().unwrap_or(Value::Null))
    }

    /// Parse a text frame, distinguishing unknown op codes from malformed JSON
    pub fn parse(text: &str) -> Result<Self, FrameError> {
        let raw: RawFrame = serde_json::from_str(text)?;
        let op = OpCode::from_u8(raw.op).ok_or(FrameError::UnknownOpcode(raw.op))?;

        Ok(Self {
            op,
            t: raw.t,
            s: raw.s,
            rev: raw.rev,
            d: raw.d,
        })
    }

    // === Utilities ===

    /// Check if this is a valid client message
    #[must_use]
    pub fn is_valid_client_message(&self) -> bool {
        self.op.is_client_op()
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

impl std::fmt::Display for GatewayMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(t) = &self.t {
            write!(f, "GatewayMessage(op={}, t={}", self.op, t)?;
            if let Some(s) = self.s {
                write!(f, ", s={s}")?;
            }
            if let Some(rev) = self.rev {
                write!(f, ", rev={rev}")?;
            }
            write!(f, ")")
        } else {
            write!(f, "GatewayMessage(op={})", self.op)
        }
    }
}
