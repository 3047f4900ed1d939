//! In-memory implementation of MessageRepository

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::instrument;

use presence_core::entities::{Message, MessageDraft};
use presence_core::traits::{MessageRepository, RepoResult};

/// Append-only message store held in process memory
#[derive(Debug, Default)]
pub struct MemoryMessageRepository {
    messages: RwLock<Vec<Message>>,
}

impl MemoryMessageRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every stored message in insertion order
    pub fn all(&self) -> Vec<Message> {
        self.messages.read().clone()
    }
}

#[async_trait]
impl MessageRepository for MemoryMessageRepository {
    #[instrument(skip(self, draft), fields(sender_id = %draft.sender_id, receiver_id = %draft.receiver_id))]
    async fn create(&self, draft: &MessageDraft) -> RepoResult<Message> {
        let message = Message::from_draft(draft)?;
        self.messages.write().push(message.clone());

        tracing::debug!(message_id = %message.id, "Message stored");
        Ok(message)
    }

    async fn count(&self) -> RepoResult<usize> {
        Ok(self.messages.read().len())
    }
}
