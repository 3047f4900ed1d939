//! Per-conversation message log
//!
//! Holds recent relayed messages keyed by the unordered pair of participants,
//! so the fallback transport can replay a conversation. Each conversation keeps
//! at most `capacity` messages; the oldest are evicted first.

use std::collections::{HashMap, VecDeque};

use parking_lot::RwLock;
use presence_core::Message;

/// Unordered pair of user ids
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ConversationKey(String, String);

impl ConversationKey {
    fn new(a: &str, b: &str) -> Self {
        if a <= b {
            Self(a.to_string(), b.to_string())
        } else {
            Self(b.to_string(), a.to_string())
        }
    }
}

/// Messages kept per conversation unless configured otherwise
pub const DEFAULT_CONVERSATION_CAPACITY: usize = 1000;

#[derive(Debug)]
pub struct ConversationLog {
    conversations: RwLock<HashMap<ConversationKey, VecDeque<Message>>>,
    capacity: usize,
}

impl Default for ConversationLog {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CONVERSATION_CAPACITY)
    }
}

impl ConversationLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep at most `capacity` messages per conversation (at least one)
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            conversations: RwLock::new(HashMap::new()),
            capacity: capacity.max(1),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn append(&self, message: Message) {
        let key = ConversationKey::new(message.sender_id.as_str(), message.receiver_id.as_str());
        let mut conversations = self.conversations.write();
        let log = conversations.entry(key).or_default();
        if log.len() == self.capacity {
            log.pop_front();
        }
        log.push_back(message);
    }

    /// Messages between `a` and `b` in insertion order
    pub fn conversation(&self, a: &str, b: &str) -> Vec<Message> {
        self.conversations
            .read()
            .get(&ConversationKey::new(a, b))
            .map(|log| log.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Number of conversations with at least one message
    pub fn len(&self) -> usize {
        self.conversations.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.conversations.read().is_empty()
    }
}
