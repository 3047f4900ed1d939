//! Heartbeat handler (op 1)

use super::HandlerResult;
use crate::connection::Connection;
use crate::protocol::{CloseCode, GatewayMessage};
use crate::server::GatewayState;
use std::sync::Arc;

/// Handles heartbeat messages
pub struct HeartbeatHandler;

impl HeartbeatHandler {
    /// Acknowledge a heartbeat and refresh the user's last-seen time
    ///
    /// Allowed before Identify. Presence never expires on missed heartbeats.
    pub async fn handle(
        state: &GatewayState,
        connection: &Arc<Connection>,
    ) -> HandlerResult<Option<CloseCode>> {
        if let Some(user_id) = connection.user_id() {
            state.service_context().presence().heartbeat(user_id.as_str());
        }

        tracing::trace!(
            session_id = %connection.session_id(),
            server_seq = connection.current_sequence(),
            "Heartbeat received"
        );

        if let Err(e) = connection.send(GatewayMessage::heartbeat_ack()) {
            tracing::warn!(
                session_id = %connection.session_id(),
                error = %e,
                "Failed to queue heartbeat ACK"
            );
        }

        Ok(None)
    }
}
