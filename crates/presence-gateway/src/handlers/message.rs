//! Send message handler (op 4)

use super::{HandlerError, HandlerResult};
use crate::connection::Connection;
use crate::events::{GatewayEventType, MessageErrorPayload};
use crate::protocol::{CloseCode, SendMessagePayload};
use crate::server::GatewayState;
use std::sync::Arc;

/// Handles direct messages sent over the push channel
pub struct MessageHandler;

impl MessageHandler {
    /// Relay a message
    ///
    /// Delivery (`receive_message` / `message_sent`) happens through the event
    /// bus. A rejected send is reported with `message_error` and does not close
    /// the connection.
    pub async fn handle(
        state: &GatewayState,
        connection: &Arc<Connection>,
        payload: SendMessagePayload,
    ) -> HandlerResult<Option<CloseCode>> {
        let user_id = connection.user_id().ok_or(HandlerError::NotAuthenticated)?;
        let draft = payload.into_draft(user_id.as_str());

        match state.service_context().relay().send(draft).await {
            Ok(message) => {
                tracing::debug!(
                    session_id = %connection.session_id(),
                    message_id = %message.id,
                    "Message relayed over gateway"
                );
            }
            Err(e) => {
                tracing::warn!(
                    session_id = %connection.session_id(),
                    error = %e,
                    "Message rejected"
                );

                let error = MessageErrorPayload {
                    code: e.error_code().to_string(),
                    message: e.to_string(),
                };
                let frame = GatewayEventType::MessageError
                    .dispatch(serde_json::to_value(error).unwrap_or_default());
                if let Err(send_err) = connection.send(frame) {
                    tracing::warn!(
                        session_id = %connection.session_id(),
                        error = %send_err,
                        "Failed to report message error"
                    );
                }
            }
        }

        Ok(None)
    }
}
