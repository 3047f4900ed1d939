//! # presence-core
//!
//! Domain layer containing presence entries, chat messages, presence events, and the
//! storage port used by the message relay.
//! This crate has zero dependencies on infrastructure (web framework, transports, etc.).

pub mod entities;
pub mod error;
pub mod events;
pub mod traits;
pub mod value_objects;

// Re-export commonly used types at crate root
pub use entities::{Message, MessageDraft, PresenceEntry, PresenceSnapshot, DEFAULT_ACTIVITY};
pub use error::DomainError;
pub use events::PresenceEvent;
pub use traits::{MessageRepository, RepoResult};
pub use value_objects::{UserId, UserIdError};
