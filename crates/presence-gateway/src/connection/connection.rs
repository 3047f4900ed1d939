//! Individual WebSocket connection
//!
//! Represents a single WebSocket connection and its state.

use crate::protocol::{CloseCode, GatewayMessage, OpCode};
use parking_lot::{Mutex, RwLock};
use presence_core::UserId;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

/// Connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionState {
    /// Connection established, waiting for Identify
    Connecting,
    /// Identify accepted, user bound
    Authenticated,
    /// Receiving broadcasts
    Open,
    /// Connection is closed
    Closed,
}

/// Item on a connection's outbound queue
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    Message(GatewayMessage),
    /// Send a close frame with this code and stop writing
    Close(CloseCode),
}

/// Why a non-blocking enqueue failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SendError {
    #[error("outbound queue is full")]
    Full,
    #[error("connection is closed")]
    Closed,
}

impl<T> From<mpsc::error::TrySendError<T>> for SendError {
    fn from(err: mpsc::error::TrySendError<T>) -> Self {
        match err {
            mpsc::error::TrySendError::Full(_) => Self::Full,
            mpsc::error::TrySendError::Closed(_) => Self::Closed,
        }
    }
}

/// A single WebSocket connection
pub struct Connection {
    /// Unique session ID
    session_id: String,

    /// Identified user (None until Identify)
    user_id: RwLock<Option<UserId>>,

    /// Current connection state
    state: RwLock<ConnectionState>,

    /// Bounded queue drained by the socket writer
    sender: mpsc::Sender<Outbound>,

    /// Last dispatch sequence number queued; held across the enqueue so
    /// sequence numbers leave in order
    sequence: Mutex<u64>,

    /// Connection creation time
    created_at: Instant,
}

impl Connection {
    /// Create a new connection
    pub fn new(session_id: String, sender: mpsc::Sender<Outbound>) -> Arc<Self> {
        Arc::new(Self {
            session_id,
            user_id: RwLock::new(None),
            state: RwLock::new(ConnectionState::Connecting),
            sender,
            sequence: Mutex::new(0),
            created_at: Instant::now(),
        })
    }

    /// Get the session ID
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Get the user ID (if identified)
    pub fn user_id(&self) -> Option<UserId> {
        self.user_id.read().clone()
    }

    /// Bind the connection to a user
    pub fn set_user_id(&self, user_id: UserId) {
        *self.user_id.write() = Some(user_id);
    }

    /// Get the current state
    pub fn state(&self) -> ConnectionState {
        *self.state.read()
    }

    /// Set the connection state
    pub fn set_state(&self, state: ConnectionState) {
        *self.state.write() = state;
    }

    /// Check if the connection has completed Identify
    pub fn is_authenticated(&self) -> bool {
        self.user_id.read().is_some()
    }

    /// Check if the connection receives broadcasts
    pub fn is_open(&self) -> bool {
        self.state() == ConnectionState::Open
    }

    /// Get the current sequence number
    pub fn current_sequence(&self) -> u64 {
        *self.sequence.lock()
    }

    /// Get connection age
    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }

    /// Queue a message without waiting
    ///
    /// Dispatch messages are stamped with the next sequence number; the counter
    /// only advances when the enqueue succeeds.
    pub fn send(&self, message: GatewayMessage) -> Result<(), SendError> {
        if message.op != OpCode::Dispatch {
            return Ok(self.sender.try_send(Outbound::Message(message))?);
        }

        let mut sequence = self.sequence.lock();
        let next = *sequence + 1;
        self.sender
            .try_send(Outbound::Message(message.with_sequence(next)))?;
        *sequence = next;
        Ok(())
    }

    /// Ask the writer to close the socket with `code`
    pub fn close(&self, code: CloseCode) -> Result<(), SendError> {
        Ok(self.sender.try_send(Outbound::Close(code))?)
    }

    /// Check if the writer side has gone away
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("session_id", &self.session_id)
            .field("user_id", &self.user_id())
            .field("state", &self.state())
            .field("sequence", &self.current_sequence())
            .finish()
    }
}
