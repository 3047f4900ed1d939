//! Presence store - the authoritative table of online users
//!
//! One entry per user. Connect inserts or replaces, disconnect removes, and
//! there is no implicit expiry. Every state-changing mutation bumps `revision`
//! by exactly one; clients use it to order events from different transports.

use std::collections::BTreeMap;

use parking_lot::RwLock;
use presence_core::{PresenceEntry, PresenceSnapshot, UserId};

#[derive(Debug, Default)]
struct PresenceTable {
    entries: BTreeMap<UserId, PresenceEntry>,
    revision: u64,
}

impl PresenceTable {
    fn bump(&mut self) -> u64 {
        self.revision += 1;
        self.revision
    }

    fn snapshot(&self) -> PresenceSnapshot {
        PresenceSnapshot::from_entries(self.entries.values(), self.revision)
    }
}

/// Single-writer presence table
#[derive(Debug, Default)]
pub struct PresenceStore {
    table: RwLock<PresenceTable>,
}

impl PresenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the user's entry with a fresh `Idle` one
    ///
    /// Returns the snapshot taken under the same write lock, so it always
    /// contains the user.
    pub fn connect(&self, user_id: &UserId) -> PresenceSnapshot {
        let mut table = self.table.write();
        table
            .entries
            .insert(user_id.clone(), PresenceEntry::new(user_id.clone()));
        table.bump();
        table.snapshot()
    }

    /// Remove the user's entry; returns the new revision if one was removed
    pub fn disconnect(&self, user_id: &str) -> Option<u64> {
        let mut table = self.table.write();
        table.entries.remove(user_id)?;
        Some(table.bump())
    }

    /// Set the user's activity if they are online; returns the new revision if applied
    pub fn update_activity(&self, user_id: &str, activity: &str) -> Option<u64> {
        let mut table = self.table.write();
        table.entries.get_mut(user_id)?.set_activity(activity);
        Some(table.bump())
    }

    /// Refresh `last_seen_at` without changing the revision
    pub fn touch(&self, user_id: &str) -> bool {
        match self.table.write().entries.get_mut(user_id) {
            Some(entry) => {
                entry.touch();
                true
            }
            None => false,
        }
    }

    pub fn snapshot(&self) -> PresenceSnapshot {
        self.table.read().snapshot()
    }

    pub fn entry(&self, user_id: &str) -> Option<PresenceEntry> {
        self.table.read().entries.get(user_id).cloned()
    }

    pub fn is_online(&self, user_id: &str) -> bool {
        self.table.read().entries.contains_key(user_id)
    }

    pub fn revision(&self) -> u64 {
        self.table.read().revision
    }

    pub fn len(&self) -> usize {
        self.table.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.read().entries.is_empty()
    }
}
