//! Presence service
//!
//! Applies presence changes to the store and announces them on the event bus.

use presence_core::{PresenceEvent, PresenceSnapshot, UserId};
use tracing::{debug, info, instrument};

use super::context::ServiceContext;
use super::error::ServiceResult;

/// Presence service
pub struct PresenceService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> PresenceService<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Mark a user online with the default activity
    ///
    /// `origin_session` names the push session performing the connect; the
    /// gateway skips it when fanning out, since that session is answered
    /// directly.
    #[instrument(skip(self))]
    pub fn connect(
        &self,
        user_id: &str,
        origin_session: Option<String>,
    ) -> ServiceResult<PresenceSnapshot> {
        let user_id = UserId::new(user_id)?;
        let snapshot = self.ctx.presence_store().connect(&user_id);

        info!(
            user_id = %user_id,
            revision = snapshot.revision,
            online = snapshot.len(),
            "User connected"
        );

        self.ctx.events().publish(PresenceEvent::UserConnected {
            user_id,
            snapshot: snapshot.clone(),
            origin_session,
        });

        Ok(snapshot)
    }

    /// Mark a user offline; returns whether they were online
    #[instrument(skip(self))]
    pub fn disconnect(&self, user_id: &str) -> ServiceResult<bool> {
        let user_id = UserId::new(user_id)?;

        let Some(revision) = self.ctx.presence_store().disconnect(user_id.as_str()) else {
            debug!(user_id = %user_id, "Disconnect for user that is not online");
            return Ok(false);
        };

        info!(user_id = %user_id, revision, "User disconnected");
        self.ctx
            .events()
            .publish(PresenceEvent::UserDisconnected { user_id, revision });

        Ok(true)
    }

    /// Replace a user's activity; ignored when the user is not online
    #[instrument(skip(self))]
    pub fn update_activity(&self, user_id: &str, activity: &str) -> ServiceResult<bool> {
        let user_id = UserId::new(user_id)?;

        let Some(revision) = self
            .ctx
            .presence_store()
            .update_activity(user_id.as_str(), activity)
        else {
            debug!(user_id = %user_id, "Activity update for user that is not online");
            return Ok(false);
        };

        debug!(user_id = %user_id, revision, "Activity updated");
        self.ctx.events().publish(PresenceEvent::ActivityUpdated {
            user_id,
            activity: activity.to_string(),
            revision,
        });

        Ok(true)
    }

    /// Heartbeat: refresh last-seen time only
    pub fn heartbeat(&self, user_id: &str) -> bool {
        self.ctx.presence_store().touch(user_id)
    }

    /// Current online users and activities
    pub fn online_users(&self) -> PresenceSnapshot {
        self.ctx.presence_store().snapshot()
    }
}
