//! Message relay
//!
//! Validates and persists direct messages, keeps them in the conversation log
//! and announces them on the event bus for push delivery.

use presence_core::{Message, MessageDraft, PresenceEvent};
use tracing::{info, instrument, warn};

use super::context::ServiceContext;
use super::error::ServiceResult;

pub struct MessageRelay<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> MessageRelay<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Validate, persist and announce a message
    ///
    /// Nothing is persisted or published when validation fails.
    #[instrument(skip(self, draft), fields(sender_id = %draft.sender_id, receiver_id = %draft.receiver_id))]
    pub async fn send(&self, draft: MessageDraft) -> ServiceResult<Message> {
        draft.check()?;

        let message = self.ctx.message_repo().create(&draft).await.map_err(|e| {
            warn!(error = %e, "Message persistence failed");
            e
        })?;

        self.ctx.conversations().append(message.clone());

        info!(message_id = %message.id, "Message relayed");
        self.ctx.events().publish(PresenceEvent::MessageCreated {
            message: message.clone(),
        });

        Ok(message)
    }

    /// Messages exchanged between two users, in the order they were relayed
    pub fn conversation(&self, user_id: &str, other_id: &str) -> Vec<Message> {
        self.ctx.conversations().conversation(user_id, other_id)
    }
}
