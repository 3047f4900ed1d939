//! Identify handler (op 2)

use super::{HandlerError, HandlerResult};
use crate::connection::{Connection, ConnectionState};
use crate::events::snapshot_frames;
use crate::protocol::{CloseCode, IdentifyPayload};
use crate::server::GatewayState;
use presence_core::UserId;
use std::sync::Arc;

/// Handles Identify messages
pub struct IdentifyHandler;

impl IdentifyHandler {
    /// Bind the connection to a user, mark them online and send the snapshot
    ///
    /// The connection is Open before the presence store is touched, so every
    /// event published after the connect reaches it. Its own `user_connected`
    /// fan-out is skipped; this connection gets the snapshot directly instead.
    pub async fn handle(
        state: &GatewayState,
        connection: &Arc<Connection>,
        payload: IdentifyPayload,
    ) -> HandlerResult<Option<CloseCode>> {
        if connection.state() != ConnectionState::Connecting {
            tracing::warn!(
                session_id = %connection.session_id(),
                "Client sent Identify while already authenticated"
            );
            return Ok(Some(CloseCode::AlreadyAuthenticated));
        }

        let user_id =
            UserId::new(payload.user_id).map_err(|e| HandlerError::InvalidPayload(e.to_string()))?;
        let session_id = connection.session_id().to_string();

        state
            .connection_manager()
            .authenticate_connection(&session_id, user_id.clone());
        connection.set_state(ConnectionState::Open);

        let snapshot = state
            .service_context()
            .presence()
            .connect(user_id.as_str(), Some(session_id.clone()))?;

        for frame in snapshot_frames(&snapshot) {
            connection
                .send(frame)
                .map_err(|e| HandlerError::Internal(format!("Failed to send snapshot: {e}")))?;
        }

        tracing::info!(
            session_id = %session_id,
            user_id = %user_id,
            revision = snapshot.revision,
            online = snapshot.len(),
            "Client identified"
        );

        Ok(None)
    }
}
