//! Activity update handler (op 3)

use super::{HandlerError, HandlerResult};
use crate::connection::Connection;
use crate::protocol::{ActivityUpdatePayload, CloseCode};
use crate::server::GatewayState;
use std::sync::Arc;

/// Handles activity updates
pub struct ActivityHandler;

impl ActivityHandler {
    /// Replace the identified user's activity
    ///
    /// The resulting `activity_updated` broadcast goes out through the event
    /// bus, so the sender's own connections receive it too.
    pub async fn handle(
        state: &GatewayState,
        connection: &Arc<Connection>,
        payload: ActivityUpdatePayload,
    ) -> HandlerResult<Option<CloseCode>> {
        let user_id = connection.user_id().ok_or(HandlerError::NotAuthenticated)?;

        let applied = state
            .service_context()
            .presence()
            .update_activity(user_id.as_str(), &payload.activity)?;

        tracing::debug!(
            session_id = %connection.session_id(),
            user_id = %user_id,
            applied,
            "Activity update"
        );

        Ok(None)
    }
}
