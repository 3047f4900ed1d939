//! Response bodies of the fallback routes, as seen by an HTTP client

use presence_core::Message;
use serde::Deserialize;

/// `{success}`
#[derive(Debug, Deserialize)]
pub struct SuccessBody {
    pub success: bool,
}

/// `{onlineUsers, activities, revision}`, with `success` on connect
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotBody {
    #[serde(default)]
    pub success: Option<bool>,
    pub online_users: Vec<String>,
    pub activities: Vec<(String, String)>,
    pub revision: u64,
}

impl SnapshotBody {
    pub fn activity_of(&self, user_id: &str) -> Option<&str> {
        self.activities
            .iter()
            .find(|(u, _)| u == user_id)
            .map(|(_, a)| a.as_str())
    }
}

/// `{success, message}`
#[derive(Debug, Deserialize)]
pub struct SentBody {
    pub success: bool,
    pub message: Message,
}

/// `{code, message}` or just `{message}`
#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub code: Option<String>,
    pub message: String,
}

/// Socket.IO probe answer
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeBody {
    pub sid: String,
    pub upgrades: Vec<String>,
    pub ping_interval: u64,
    pub ping_timeout: u64,
}

/// `/health`
#[derive(Debug, Deserialize)]
pub struct HealthBody {
    pub status: String,
    pub version: String,
}
