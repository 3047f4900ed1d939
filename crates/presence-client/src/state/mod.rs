//! Reconciled client state
//!
//! [`StateStore`] owns the merged view and republishes it on a `watch`
//! channel after every change, so UI components only ever see whole states.

mod merge;
mod messages;

pub use merge::PresenceMerge;
pub use messages::MessageLog;

use crate::transport::TransportEvent;
use parking_lot::Mutex;
use presence_core::{Message, PresenceSnapshot, UserId};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tokio::sync::watch;

/// Which transport currently carries the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionMode {
    Push,
    Fallback,
    #[default]
    Disconnected,
}

/// A pushed message the server refused to store
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SendFailure {
    pub code: String,
    pub message: String,
}

/// What the client currently believes about presence and its conversation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientState {
    pub online_users: BTreeSet<UserId>,
    pub activities: BTreeMap<UserId, String>,
    /// Arrival order, not creation order
    pub messages: Vec<Message>,
    pub connection_mode: ConnectionMode,
    /// Rejection of the latest push send, cleared by the next send
    pub last_send_error: Option<SendFailure>,
}

impl ClientState {
    pub fn is_online(&self, user_id: &str) -> bool {
        self.online_users.contains(user_id)
    }

    pub fn activity_of(&self, user_id: &str) -> Option<&str> {
        self.activities.get(user_id).map(String::as_str)
    }
}

#[derive(Debug, Default)]
struct Inner {
    presence: PresenceMerge,
    messages: MessageLog,
    mode: ConnectionMode,
    send_error: Option<SendFailure>,
}

impl Inner {
    fn view(&self) -> ClientState {
        ClientState {
            online_users: self.presence.online().clone(),
            activities: self.presence.activities().clone(),
            messages: self.messages.as_slice().to_vec(),
            connection_mode: self.mode,
            last_send_error: self.send_error.clone(),
        }
    }
}

/// Single owner of the client state
pub struct StateStore {
    inner: Mutex<Inner>,
    tx: watch::Sender<ClientState>,
}

impl StateStore {
    #[must_use]
    pub fn new() -> Self {
        let (tx, _) = watch::channel(ClientState::default());
        Self {
            inner: Mutex::new(Inner::default()),
            tx,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<ClientState> {
        self.tx.subscribe()
    }

    /// Latest published state
    pub fn current(&self) -> ClientState {
        self.tx.borrow().clone()
    }

    pub fn mode(&self) -> ConnectionMode {
        self.inner.lock().mode
    }

    /// Fold one transport event into the state
    ///
    /// Returns whether anything visible changed.
    pub fn apply(&self, event: &TransportEvent) -> bool {
        self.update(|inner| match event {
            TransportEvent::UsersOnline { users, revision } => {
                inner.presence.apply_online_users(users, *revision)
            }
            TransportEvent::Activities {
                activities,
                revision,
            } => inner.presence.apply_activities(activities, *revision),
            TransportEvent::Snapshot(snapshot) => apply_snapshot(&mut inner.presence, snapshot),
            TransportEvent::UserConnected { user_id, revision } => {
                inner.presence.user_connected(user_id, *revision)
            }
            TransportEvent::UserDisconnected { user_id, revision } => {
                inner.presence.user_disconnected(user_id, *revision)
            }
            TransportEvent::ActivityUpdated {
                user_id,
                activity,
                revision,
            } => inner.presence.activity_updated(user_id, activity, *revision),
            TransportEvent::Message(message) => inner.messages.push(message.clone()),
            TransportEvent::MessageRejected { code, message } => {
                inner.send_error = Some(SendFailure {
                    code: code.clone(),
                    message: message.clone(),
                });
                true
            }
            TransportEvent::PushConfirmed
            | TransportEvent::PushClosed { .. } => false,
        })
    }

    pub fn apply_snapshot(&self, snapshot: &PresenceSnapshot) -> bool {
        self.update(|inner| apply_snapshot(&mut inner.presence, snapshot))
    }

    pub fn append_message(&self, message: Message) -> bool {
        self.update(|inner| inner.messages.push(message))
    }

    pub fn replace_messages(&self, messages: Vec<Message>) {
        self.update(|inner| {
            inner.messages.replace(messages);
            true
        });
    }

    pub fn clear_send_error(&self) -> bool {
        self.update(|inner| inner.send_error.take().is_some())
    }

    pub fn set_mode(&self, mode: ConnectionMode) -> bool {
        self.update(|inner| {
            let changed = inner.mode != mode;
            inner.mode = mode;
            changed
        })
    }

    /// Drop all presence knowledge and mark the session disconnected
    ///
    /// Messages are kept.
    pub fn reset_presence(&self) {
        self.update(|inner| {
            inner.presence.clear();
            inner.mode = ConnectionMode::Disconnected;
            inner.send_error = None;
            true
        });
    }

    fn update(&self, f: impl FnOnce(&mut Inner) -> bool) -> bool {
        let mut inner = self.inner.lock();
        let changed = f(&mut inner);
        if changed {
            self.tx.send_replace(inner.view());
        }
        changed
    }
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for StateStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("StateStore")
            .field("online", &inner.presence.online().len())
            .field("messages", &inner.messages.len())
            .field("mode", &inner.mode)
            .finish()
    }
}

fn apply_snapshot(presence: &mut PresenceMerge, snapshot: &PresenceSnapshot) -> bool {
    let revision = Some(snapshot.revision);
    let online = presence.apply_online_users(&snapshot.online_users, revision);
    let activities = presence.apply_activities(&snapshot.activities, revision);
    online || activities
}
