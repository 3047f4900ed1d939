//! Connection manager
//!
//! Manages all active WebSocket connections using DashMap for thread-safe access.

use super::{Connection, ConnectionState, Outbound, SendError};
use crate::protocol::GatewayMessage;
use dashmap::DashMap;
use presence_core::UserId;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Manages all active WebSocket connections
///
/// Fan-out never waits on a peer: every send is a non-blocking enqueue, and a
/// connection whose queue is full simply misses that copy.
pub struct ConnectionManager {
    /// Active connections by session ID
    connections: DashMap<String, Arc<Connection>>,

    /// User ID to session IDs mapping
    user_connections: DashMap<UserId, HashSet<String>>,
}

impl ConnectionManager {
    /// Create a new connection manager
    #[must_use]
    pub fn new() -> Self {
        Self {
            connections: DashMap::new(),
            user_connections: DashMap::new(),
        }
    }

    /// Create a new connection manager wrapped in Arc
    #[must_use]
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Register a new connection
    pub fn add_connection(
        &self,
        session_id: String,
        sender: mpsc::Sender<Outbound>,
    ) -> Arc<Connection> {
        let connection = Connection::new(session_id.clone(), sender);
        self.connections.insert(session_id.clone(), connection.clone());

        tracing::debug!(session_id = %session_id, "Connection added");

        connection
    }

    /// Remove a connection, returning it if it was registered
    pub fn remove_connection(&self, session_id: &str) -> Option<Arc<Connection>> {
        let (_, connection) = self.connections.remove(session_id)?;

        if let Some(user_id) = connection.user_id() {
            if let Some(mut sessions) = self.user_connections.get_mut(&user_id) {
                sessions.remove(session_id);
            }
            self.user_connections
                .remove_if(&user_id, |_, sessions| sessions.is_empty());
        }

        tracing::debug!(session_id = %session_id, "Connection removed");
        Some(connection)
    }

    /// Get a connection by session ID
    pub fn get_connection(&self, session_id: &str) -> Option<Arc<Connection>> {
        self.connections.get(session_id).map(|r| r.clone())
    }

    /// Bind a connection to a user and mark it authenticated
    pub fn authenticate_connection(&self, session_id: &str, user_id: UserId) -> bool {
        let Some(connection) = self.get_connection(session_id) else {
            return false;
        };

        connection.set_user_id(user_id.clone());
        connection.set_state(ConnectionState::Authenticated);

        self.user_connections
            .entry(user_id.clone())
            .or_default()
            .insert(session_id.to_string());

        tracing::debug!(
            session_id = %session_id,
            user_id = %user_id,
            "Connection authenticated"
        );

        true
    }

    /// Get all connections for a user
    pub fn get_user_connections(&self, user_id: &str) -> Vec<Arc<Connection>> {
        let sessions: Vec<String> = self
            .user_connections
            .get(user_id)
            .map(|sessions| sessions.iter().cloned().collect())
            .unwrap_or_default();

        sessions
            .iter()
            .filter_map(|sid| self.get_connection(sid))
            .collect()
    }

    /// Check whether any of the user's connections is still Open
    pub fn has_open_connection(&self, user_id: &str) -> bool {
        self.get_user_connections(user_id)
            .iter()
            .any(|conn| conn.is_open())
    }

    /// Send a message to all Open connections of a user
    pub fn send_to_user(&self, user_id: &str, message: &GatewayMessage) -> usize {
        let sent = self
            .get_user_connections(user_id)
            .iter()
            .filter(|conn| conn.is_open())
            .filter(|conn| Self::deliver(conn, message.clone()))
            .count();

        tracing::trace!(user_id = %user_id, sent, "Message sent to user connections");

        sent
    }

    /// Broadcast a message to every Open connection, optionally skipping one session
    pub fn broadcast(&self, message: &GatewayMessage, exclude_session: Option<&str>) -> usize {
        let targets: Vec<Arc<Connection>> = self
            .connections
            .iter()
            .filter(|entry| Some(entry.key().as_str()) != exclude_session)
            .map(|entry| entry.value().clone())
            .collect();

        let sent = targets
            .iter()
            .filter(|conn| conn.is_open())
            .filter(|conn| Self::deliver(conn, message.clone()))
            .count();

        tracing::trace!(sent, "Message broadcast");

        sent
    }

    fn deliver(connection: &Connection, message: GatewayMessage) -> bool {
        match connection.send(message) {
            Ok(()) => true,
            Err(SendError::Full) => {
                tracing::warn!(
                    session_id = %connection.session_id(),
                    "Outbound queue full, dropping message"
                );
                false
            }
            Err(SendError::Closed) => {
                tracing::trace!(
                    session_id = %connection.session_id(),
                    "Skipping closed connection"
                );
                false
            }
        }
    }

    /// Get the total number of connections
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Get the number of unique users with at least one connection
    pub fn user_count(&self) -> usize {
        self.user_connections.len()
    }

    /// All registered session IDs
    pub fn session_ids(&self) -> Vec<String> {
        self.connections.iter().map(|e| e.key().clone()).collect()
    }
}

impl Default for ConnectionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("connections", &self.connection_count())
            .field("users", &self.user_count())
            .finish()
    }
}
