//! Client transports
//!
//! Both transports implement [`PresenceTransport`] and report everything they
//! learn from the server as [`TransportEvent`]s on one channel, which the
//! reconciler's merge task consumes.

mod events;
mod polling;
mod push;

pub use events::{TransportEvent, TransportKind};
pub use polling::PollingTransport;
pub use push::{PushStatus, PushTransport};

use crate::error::ClientResult;
use async_trait::async_trait;
use presence_core::{Message, MessageDraft, PresenceSnapshot, UserId};

/// Operations every transport offers to the reconciler
#[async_trait]
pub trait PresenceTransport: Send + Sync {
    fn kind(&self) -> TransportKind;

    /// Announce the user as online
    async fn connect(&self, user_id: &UserId) -> ClientResult<()>;

    /// Announce the user as offline and release the transport
    async fn disconnect(&self, user_id: &UserId) -> ClientResult<()>;

    async fn update_activity(&self, user_id: &UserId, activity: &str) -> ClientResult<()>;

    /// Send a message
    ///
    /// Returns the stored message when the transport answers synchronously;
    /// `None` when it will arrive later as an event.
    async fn send_message(&self, draft: MessageDraft) -> ClientResult<Option<Message>>;

    async fn get_online_users(&self) -> ClientResult<PresenceSnapshot>;
}
