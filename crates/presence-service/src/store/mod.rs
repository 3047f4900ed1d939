//! In-memory stores
//!
//! Process-local state. Nothing here survives a restart.

mod conversation_log;
mod presence_store;

pub use conversation_log::{ConversationLog, DEFAULT_CONVERSATION_CAPACITY};
pub use presence_store::PresenceStore;
