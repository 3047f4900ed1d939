//! Polling fallback over the `/websocket/*` HTTP routes
//!
//! Stateless request/response calls plus a poll loop that refreshes the
//! online-user snapshot at a fixed interval.

use super::{PresenceTransport, TransportEvent, TransportKind};
use crate::error::{ClientError, ClientResult};
use async_trait::async_trait;
use presence_common::ErrorResponse;
use presence_core::{Message, MessageDraft, PresenceSnapshot, UserId};
use reqwest::{Response, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UserBody<'a> {
    user_id: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ActivityBody<'a> {
    user_id: &'a str,
    activity: &'a str,
}

#[derive(Deserialize)]
struct Ack {
    #[serde(default)]
    success: bool,
}

#[derive(Deserialize)]
struct ConnectBody {
    #[serde(flatten)]
    snapshot: PresenceSnapshot,
}

#[derive(Deserialize)]
struct SentBody {
    message: Message,
}

/// HTTP fallback client
pub struct PollingTransport {
    http: reqwest::Client,
    base: Url,
    events: mpsc::Sender<TransportEvent>,
}

impl PollingTransport {
    pub fn new(
        http: reqwest::Client,
        base_url: &str,
        events: mpsc::Sender<TransportEvent>,
    ) -> ClientResult<Self> {
        let base = Url::parse(base_url)
            .map_err(|e| ClientError::InvalidInput(format!("invalid base url {base_url}: {e}")))?;
        if base.cannot_be_a_base() {
            return Err(ClientError::InvalidInput(format!(
                "invalid base url {base_url}"
            )));
        }

        Ok(Self { http, base, events })
    }

    /// `{base}/websocket/{segments...}`, each segment percent-encoded
    fn endpoint(&self, segments: &[&str]) -> ClientResult<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| ClientError::InvalidInput(format!("invalid base url {}", self.base)))?
            .pop_if_empty()
            .push("websocket")
            .extend(segments);
        Ok(url)
    }

    async fn post<B, T>(&self, segments: &[&str], body: &B) -> ClientResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self
            .http
            .post(self.endpoint(segments)?)
            .json(body)
            .send()
            .await?;
        read_json(response).await
    }

    async fn get<T: DeserializeOwned>(&self, segments: &[&str]) -> ClientResult<T> {
        let response = self.http.get(self.endpoint(segments)?).send().await?;
        read_json(response).await
    }

    /// Conversation log between two users, oldest first
    pub async fn conversation(&self, user_id: &str, other_id: &str) -> ClientResult<Vec<Message>> {
        self.get(&["messages", user_id, other_id]).await
    }

    /// Refresh the snapshot every `interval` until the event channel closes
    ///
    /// Failed polls are logged and retried on the next tick.
    pub async fn poll_loop(self: Arc<Self>, interval: Duration) {
        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            match self.get_online_users().await {
                Ok(snapshot) => {
                    tracing::trace!(revision = snapshot.revision, online = snapshot.len(), "Polled presence");
                    if self.events.send(TransportEvent::Snapshot(snapshot)).await.is_err() {
                        break;
                    }
                }
                Err(e) => tracing::warn!(error = %e, "Presence poll failed"),
            }
        }
    }
}

#[async_trait]
impl PresenceTransport for PollingTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Fallback
    }

    async fn connect(&self, user_id: &UserId) -> ClientResult<()> {
        let body: ConnectBody = self
            .post(&["connect"], &UserBody {
                user_id: user_id.as_str(),
            })
            .await?;

        tracing::debug!(user_id = %user_id, revision = body.snapshot.revision, "Fallback connected");

        let _ = self.events.send(TransportEvent::Snapshot(body.snapshot)).await;
        Ok(())
    }

    async fn disconnect(&self, user_id: &UserId) -> ClientResult<()> {
        let ack: Ack = self
            .post(&["disconnect"], &UserBody {
                user_id: user_id.as_str(),
            })
            .await?;
        tracing::debug!(user_id = %user_id, success = ack.success, "Fallback disconnected");
        Ok(())
    }

    async fn update_activity(&self, user_id: &UserId, activity: &str) -> ClientResult<()> {
        let _: Ack = self
            .post(&["activity"], &ActivityBody {
                user_id: user_id.as_str(),
                activity,
            })
            .await?;
        Ok(())
    }

    async fn send_message(&self, draft: MessageDraft) -> ClientResult<Option<Message>> {
        let body: SentBody = self.post(&["message"], &draft).await?;
        Ok(Some(body.message))
    }

    async fn get_online_users(&self) -> ClientResult<PresenceSnapshot> {
        self.get(&["users"]).await
    }
}

impl std::fmt::Debug for PollingTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PollingTransport")
            .field("base", &self.base.as_str())
            .finish()
    }
}

/// Decode a success body, or turn an error body into [`ClientError::Rejected`]
async fn read_json<T: DeserializeOwned>(response: Response) -> ClientResult<T> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json().await?);
    }

    let text = response.text().await.unwrap_or_default();
    let (code, message) = match serde_json::from_str::<ErrorResponse>(&text) {
        Ok(body) => (body.code, body.message),
        Err(_) => (String::new(), text),
    };

    Err(ClientError::Rejected {
        status: status.as_u16(),
        code,
        message,
    })
}
