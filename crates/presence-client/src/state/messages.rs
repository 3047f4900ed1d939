//! Arrival-ordered message log with id de-duplication

use presence_core::Message;
use std::collections::HashSet;
use uuid::Uuid;

#[derive(Debug, Clone, Default)]
pub struct MessageLog {
    messages: Vec<Message>,
    seen: HashSet<Uuid>,
}

impl MessageLog {
    /// Append a message unless one with the same id was already recorded
    pub fn push(&mut self, message: Message) -> bool {
        if !self.seen.insert(message.id) {
            return false;
        }
        self.messages.push(message);
        true
    }

    /// Replace the whole log, keeping the first copy of any repeated id
    pub fn replace(&mut self, messages: Vec<Message>) {
        self.messages.clear();
        self.seen.clear();
        for message in messages {
            self.push(message);
        }
    }

    pub fn as_slice(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
