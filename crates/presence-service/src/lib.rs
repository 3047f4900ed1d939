//! # presence-service
//!
//! Application layer shared by both transports: the presence store, the
//! message relay, and the in-process event bus that carries their changes to
//! the push gateway.

pub mod events;
pub mod services;
pub mod store;

pub use events::EventBus;
pub use services::{
    MessageRelay, PresenceService, ServiceContext, ServiceContextBuilder, ServiceError,
    ServiceResult,
};
pub use store::{ConversationLog, PresenceStore};
