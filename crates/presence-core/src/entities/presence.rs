//! Presence entities - liveness records and point-in-time snapshots

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::value_objects::UserId;

/// Activity assigned to a user when they connect
pub const DEFAULT_ACTIVITY: &str = "Idle";

/// Liveness and activity record for one connected user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceEntry {
    pub user_id: UserId,
    pub last_seen_at: DateTime<Utc>,
    pub activity: String,
}

impl PresenceEntry {
    /// Create a fresh entry with the default activity
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            last_seen_at: Utc::now(),
            activity: DEFAULT_ACTIVITY.to_string(),
        }
    }

    /// Replace the activity and refresh `last_seen_at`
    pub fn set_activity(&mut self, activity: impl Into<String>) {
        self.activity = activity.into();
        self.touch();
    }

    /// Refresh `last_seen_at`
    pub fn touch(&mut self) {
        self.last_seen_at = Utc::now();
    }
}

/// Consistent point-in-time copy of all presence data
///
/// `revision` is the presence store's mutation counter when the copy was taken.
/// Clients compare it against the revisions carried by delta events to decide
/// which view of a user is newer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceSnapshot {
    pub online_users: Vec<UserId>,
    pub activities: Vec<(UserId, String)>,
    #[serde(default)]
    pub revision: u64,
}

impl PresenceSnapshot {
    /// Build a snapshot from presence entries
    pub fn from_entries<'a>(entries: impl IntoIterator<Item = &'a PresenceEntry>, revision: u64) -> Self {
        let mut online_users = Vec::new();
        let mut activities = Vec::new();

        for entry in entries {
            online_users.push(entry.user_id.clone());
            activities.push((entry.user_id.clone(), entry.activity.clone()));
        }

        Self {
            online_users,
            activities,
            revision,
        }
    }

    /// Check whether a user is online in this snapshot
    pub fn contains(&self, user_id: &str) -> bool {
        self.online_users.iter().any(|u| u.as_str() == user_id)
    }

    /// Look up a user's activity in this snapshot
    pub fn activity_of(&self, user_id: &str) -> Option<&str> {
        self.activities
            .iter()
            .find(|(u, _)| u.as_str() == user_id)
            .map(|(_, activity)| activity.as_str())
    }

    /// Number of online users
    pub fn len(&self) -> usize {
        self.online_users.len()
    }

    /// Whether nobody is online
    pub fn is_empty(&self) -> bool {
        self.online_users.is_empty()
    }
}
