//! Service context - dependency container for services
//!
//! Holds the stores, the storage collaborator and the event bus. Cloning is
//! cheap and every clone shares the same state.

use std::sync::Arc;

use presence_core::traits::MessageRepository;
use presence_db::MemoryMessageRepository;

use crate::events::EventBus;
use crate::store::{ConversationLog, PresenceStore};

use super::presence::PresenceService;
use super::relay::MessageRelay;

/// Service context containing all dependencies
#[derive(Clone)]
pub struct ServiceContext {
    presence_store: Arc<PresenceStore>,
    conversations: Arc<ConversationLog>,
    message_repo: Arc<dyn MessageRepository>,
    events: EventBus,
}

impl ServiceContext {
    pub fn new(message_repo: Arc<dyn MessageRepository>, events: EventBus) -> Self {
        Self::with_conversations(message_repo, events, ConversationLog::new())
    }

    fn with_conversations(
        message_repo: Arc<dyn MessageRepository>,
        events: EventBus,
        conversations: ConversationLog,
    ) -> Self {
        Self {
            presence_store: Arc::new(PresenceStore::new()),
            conversations: Arc::new(conversations),
            message_repo,
            events,
        }
    }

    /// Context backed by the in-memory message repository
    pub fn in_memory(event_bus_capacity: usize) -> Self {
        Self::new(
            Arc::new(MemoryMessageRepository::new()),
            EventBus::new(event_bus_capacity),
        )
    }

    // === Stores ===

    pub fn presence_store(&self) -> &PresenceStore {
        &self.presence_store
    }

    pub fn conversations(&self) -> &ConversationLog {
        &self.conversations
    }

    // === Storage collaborator ===

    pub fn message_repo(&self) -> &dyn MessageRepository {
        self.message_repo.as_ref()
    }

    // === Events ===

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    // === Services ===

    pub fn presence(&self) -> PresenceService<'_> {
        PresenceService::new(self)
    }

    pub fn relay(&self) -> MessageRelay<'_> {
        MessageRelay::new(self)
    }
}

impl std::fmt::Debug for ServiceContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceContext")
            .field("online_users", &self.presence_store.len())
            .field("revision", &self.presence_store.revision())
            .field("message_repo", &"dyn MessageRepository")
            .field("event_subscribers", &self.events.subscriber_count())
            .finish()
    }
}

/// Builder for creating ServiceContext with custom dependencies
#[derive(Default)]
pub struct ServiceContextBuilder {
    message_repo: Option<Arc<dyn MessageRepository>>,
    event_bus: Option<EventBus>,
    event_bus_capacity: Option<usize>,
    conversation_capacity: Option<usize>,
}

impl ServiceContextBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn message_repo(mut self, repo: Arc<dyn MessageRepository>) -> Self {
        self.message_repo = Some(repo);
        self
    }

    pub fn event_bus(mut self, bus: EventBus) -> Self {
        self.event_bus = Some(bus);
        self
    }

    pub fn event_bus_capacity(mut self, capacity: usize) -> Self {
        self.event_bus_capacity = Some(capacity);
        self
    }

    /// Messages kept per conversation in the relay log
    pub fn conversation_capacity(mut self, capacity: usize) -> Self {
        self.conversation_capacity = Some(capacity);
        self
    }

    /// Build the ServiceContext
    ///
    /// Missing dependencies fall back to the in-memory repository and a bus
    /// with the configured (or default) capacity.
    pub fn build(self) -> ServiceContext {
        let events = self.event_bus.unwrap_or_else(|| match self.event_bus_capacity {
            Some(capacity) => EventBus::new(capacity),
            None => EventBus::default(),
        });
        let message_repo = self
            .message_repo
            .unwrap_or_else(|| Arc::new(MemoryMessageRepository::new()));

        let conversations = match self.conversation_capacity {
            Some(capacity) => ConversationLog::with_capacity(capacity),
            None => ConversationLog::new(),
        };

        ServiceContext::with_conversations(message_repo, events, conversations)
    }
}
