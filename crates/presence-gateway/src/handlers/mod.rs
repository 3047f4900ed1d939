//! Op code handlers
//!
//! Handles incoming WebSocket messages based on their operation code.

mod activity;
mod error;
mod heartbeat;
mod identify;
mod message;

pub use activity::ActivityHandler;
pub use error::{HandlerError, HandlerResult};
pub use heartbeat::HeartbeatHandler;
pub use identify::IdentifyHandler;
pub use message::MessageHandler;

use crate::connection::Connection;
use crate::protocol::{CloseCode, GatewayMessage, OpCode};
use crate::server::GatewayState;
use serde::de::DeserializeOwned;
use std::sync::Arc;

/// Dispatch incoming client messages to appropriate handlers
pub struct MessageDispatcher;

impl MessageDispatcher {
    /// Handle an incoming client message
    ///
    /// `Ok(Some(code))` asks the caller to close the connection with `code`.
    pub async fn dispatch(
        state: &GatewayState,
        connection: &Arc<Connection>,
        message: GatewayMessage,
    ) -> HandlerResult<Option<CloseCode>> {
        if !message.is_valid_client_message() {
            tracing::warn!(
                session_id = %connection.session_id(),
                op = %message.op,
                "Received server-only op code from client"
            );
            return Ok(Some(CloseCode::UnknownOpcode));
        }

        if matches!(message.op, OpCode::ActivityUpdate | OpCode::SendMessage)
            && !connection.is_authenticated()
        {
            return Err(HandlerError::NotAuthenticated);
        }

        match message.op {
            OpCode::Heartbeat => HeartbeatHandler::handle(state, connection).await,
            OpCode::Identify => {
                let payload = decode(&message)?;
                IdentifyHandler::handle(state, connection, payload).await
            }
            OpCode::ActivityUpdate => {
                let payload = decode(&message)?;
                ActivityHandler::handle(state, connection, payload).await
            }
            OpCode::SendMessage => {
                let payload = decode(&message)?;
                MessageHandler::handle(state, connection, payload).await
            }
            // These ops should never reach here due to is_client_op check
            _ => {
                tracing::error!(op = %message.op, "Unhandled client op code");
                Ok(Some(CloseCode::UnknownOpcode))
            }
        }
    }
}

fn decode<T: DeserializeOwned>(message: &GatewayMessage) -> HandlerResult<T> {
    message
        .payload()
        .map_err(|e| HandlerError::InvalidPayload(format!("Invalid {} payload: {e}", message.op.name())))
}
