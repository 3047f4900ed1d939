//! Revision-ordered presence merge
//!
//! Every presence fact is stamped with the server's presence revision. A user
//! keeps the revision of the last fact applied to it, and each applied
//! snapshot raises a floor shared by all users. A delta is applied only when
//! it is strictly newer than both; a snapshot part only when it is not older.
//! Facts without a revision are applied unconditionally.

use presence_core::{UserId, DEFAULT_ACTIVITY};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

/// Per-user last-writer-wins view of who is online and what they are doing
#[derive(Debug, Clone, Default)]
pub struct PresenceMerge {
    online: BTreeSet<UserId>,
    activities: BTreeMap<UserId, String>,
    marks: HashMap<UserId, u64>,
    floor: u64,
}

impl PresenceMerge {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn online(&self) -> &BTreeSet<UserId> {
        &self.online
    }

    pub fn activities(&self) -> &BTreeMap<UserId, String> {
        &self.activities
    }

    /// Highest snapshot revision applied so far
    pub fn floor(&self) -> u64 {
        self.floor
    }

    /// Revision of the newest fact known about a user
    pub fn revision_of(&self, user_id: &str) -> u64 {
        self.marks.get(user_id).copied().unwrap_or(0).max(self.floor)
    }

    fn accepts_delta(&self, user_id: &str, revision: Option<u64>) -> bool {
        revision.map_or(true, |r| r > self.revision_of(user_id))
    }

    fn accepts_snapshot(&self, user_id: &str, revision: Option<u64>) -> bool {
        revision.map_or(true, |r| r >= self.revision_of(user_id))
    }

    fn record(&mut self, user_id: &UserId, revision: Option<u64>) {
        if let Some(r) = revision {
            self.marks.insert(user_id.clone(), r);
        }
    }

    fn raise_floor(&mut self, revision: Option<u64>) {
        if let Some(r) = revision {
            if r > self.floor {
                self.floor = r;
                self.marks.retain(|_, mark| *mark > r);
            }
        }
    }

    /// Apply a full online-user list
    ///
    /// Listed users become online; known users missing from the list go
    /// offline, unless a newer fact about them has already been applied.
    pub fn apply_online_users(&mut self, users: &[UserId], revision: Option<u64>) -> bool {
        let before = (self.online.clone(), self.activities.len());
        let listed: HashSet<&str> = users.iter().map(UserId::as_str).collect();

        for user in users {
            if self.accepts_snapshot(user.as_str(), revision) {
                self.online.insert(user.clone());
            }
        }

        let stale: Vec<UserId> = self
            .online
            .iter()
            .filter(|u| !listed.contains(u.as_str()) && self.accepts_snapshot(u.as_str(), revision))
            .cloned()
            .collect();
        for user in stale {
            self.online.remove(&user);
            self.activities.remove(&user);
        }

        self.raise_floor(revision);
        before != (self.online.clone(), self.activities.len())
    }

    /// Apply a full `[userId, activity]` list
    pub fn apply_activities(&mut self, activities: &[(UserId, String)], revision: Option<u64>) -> bool {
        let before = self.activities.clone();
        let listed: HashSet<&str> = activities.iter().map(|(u, _)| u.as_str()).collect();

        for (user, activity) in activities {
            if self.accepts_snapshot(user.as_str(), revision) {
                self.online.insert(user.clone());
                self.activities.insert(user.clone(), activity.clone());
            }
        }

        let stale: Vec<UserId> = self
            .activities
            .keys()
            .filter(|u| !listed.contains(u.as_str()) && self.accepts_snapshot(u.as_str(), revision))
            .cloned()
            .collect();
        for user in stale {
            self.activities.remove(&user);
        }

        self.raise_floor(revision);
        before != self.activities
    }

    /// A user connected (or reconnected, which resets the activity)
    pub fn user_connected(&mut self, user_id: &UserId, revision: Option<u64>) -> bool {
        if !self.accepts_delta(user_id.as_str(), revision) {
            return false;
        }
        self.online.insert(user_id.clone());
        self.activities
            .insert(user_id.clone(), DEFAULT_ACTIVITY.to_string());
        self.record(user_id, revision);
        true
    }

    /// A user disconnected; the activity goes with them
    pub fn user_disconnected(&mut self, user_id: &UserId, revision: Option<u64>) -> bool {
        if !self.accepts_delta(user_id.as_str(), revision) {
            return false;
        }
        self.online.remove(user_id);
        self.activities.remove(user_id);
        self.record(user_id, revision);
        true
    }

    /// A user's activity changed
    pub fn activity_updated(&mut self, user_id: &UserId, activity: &str, revision: Option<u64>) -> bool {
        if !self.accepts_delta(user_id.as_str(), revision) {
            return false;
        }
        self.online.insert(user_id.clone());
        self.activities.insert(user_id.clone(), activity.to_string());
        self.record(user_id, revision);
        true
    }

    /// Forget everything, including revision history
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
