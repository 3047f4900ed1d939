//! Domain entities - core business objects

mod message;
mod presence;

pub use message::{Message, MessageDraft};
pub use presence::{PresenceEntry, PresenceSnapshot, DEFAULT_ACTIVITY};
