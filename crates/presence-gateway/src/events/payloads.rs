//! Event payload definitions

use presence_core::PresenceSnapshot;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::GatewayEventType;
use crate::protocol::GatewayMessage;

/// `users_online` and `activities` frames for a snapshot, stamped with its revision
#[must_use]
pub fn snapshot_frames(snapshot: &PresenceSnapshot) -> [GatewayMessage; 2] {
    [
        GatewayEventType::UsersOnline
            .dispatch(json!(snapshot.online_users))
            .with_revision(snapshot.revision),
        GatewayEventType::Activities
            .dispatch(json!(snapshot.activities))
            .with_revision(snapshot.revision),
    ]
}

/// `activity_updated` event payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityUpdatedPayload {
    pub user_id: String,
    pub activity: String,
}

/// `message_error` event payload
///
/// Sent to the sending connection when a SendMessage op is rejected. The socket
/// stays open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageErrorPayload {
    pub code: String,
    pub message: String,
}
