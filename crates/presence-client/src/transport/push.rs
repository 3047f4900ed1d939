//! Push transport over the gateway WebSocket
//!
//! Connects, waits for Hello, identifies, then runs three tasks: a reader that
//! turns dispatch frames into [`TransportEvent`]s, a writer draining the
//! outgoing queue, and a heartbeat ticker.

use super::{PresenceTransport, TransportEvent, TransportKind};
use crate::error::{ClientError, ClientResult};
use async_trait::async_trait;
use futures_util::{SinkExt, Stream, StreamExt};
use parking_lot::Mutex;
use presence_core::{Message, MessageDraft, PresenceSnapshot, UserId};
use presence_gateway::events::GatewayEventType;
use presence_gateway::protocol::{GatewayMessage, HelloPayload, OpCode, SendMessagePayload};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode as WsCloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::{Error as WsError, Message as WsMessage};

const OUTGOING_BUFFER: usize = 64;
const CLOSE_FLUSH_TIMEOUT: Duration = Duration::from_secs(1);

/// Lifecycle of the push connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushStatus {
    /// `connect` not called yet
    Idle,
    /// Socket open and Identify sent, no snapshot yet
    Pending,
    /// First `users_online` received after Identify
    Confirmed,
    Closed,
}

struct PushTasks {
    reader: JoinHandle<()>,
    writer: JoinHandle<()>,
    heartbeat: JoinHandle<()>,
}

/// Gateway client for one session
pub struct PushTransport {
    url: String,
    heartbeat_interval: Option<Duration>,
    events: mpsc::Sender<TransportEvent>,
    outgoing: Mutex<Option<mpsc::Sender<WsMessage>>>,
    status: Arc<watch::Sender<PushStatus>>,
    tasks: Mutex<Option<PushTasks>>,
}

impl PushTransport {
    /// `heartbeat_interval` overrides the interval announced in Hello
    pub fn new(
        url: impl Into<String>,
        heartbeat_interval: Option<Duration>,
        events: mpsc::Sender<TransportEvent>,
    ) -> Self {
        let (status, _) = watch::channel(PushStatus::Idle);
        Self {
            url: url.into(),
            heartbeat_interval,
            events,
            outgoing: Mutex::new(None),
            status: Arc::new(status),
            tasks: Mutex::new(None),
        }
    }

    pub fn status(&self) -> PushStatus {
        *self.status.borrow()
    }

    pub fn is_confirmed(&self) -> bool {
        self.status() == PushStatus::Confirmed
    }

    /// Wait until the handshake is confirmed or the socket closes
    pub async fn wait_confirmed(&self) -> ClientResult<()> {
        let mut rx = self.status.subscribe();
        let status = *rx
            .wait_for(|s| matches!(s, PushStatus::Confirmed | PushStatus::Closed))
            .await
            .map_err(|_| ClientError::transport("push transport dropped"))?;

        match status {
            PushStatus::Confirmed => Ok(()),
            _ => Err(ClientError::transport(
                "push connection closed before confirmation",
            )),
        }
    }

    /// Close the socket and stop every task, waiting for them to finish
    pub async fn close(&self) {
        let outgoing = self.outgoing.lock().take();
        let tasks = self.tasks.lock().take();
        self.status.send_replace(PushStatus::Closed);

        let Some(tasks) = tasks else {
            return;
        };

        tasks.heartbeat.abort();
        if let Some(tx) = outgoing {
            let frame = CloseFrame {
                code: WsCloseCode::Normal,
                reason: "client disconnect".into(),
            };
            let _ = tx.try_send(WsMessage::Close(Some(frame)));
        }

        let mut writer = tasks.writer;
        if tokio::time::timeout(CLOSE_FLUSH_TIMEOUT, &mut writer)
            .await
            .is_err()
        {
            writer.abort();
            let _ = writer.await;
        }

        tasks.reader.abort();
        let _ = tasks.reader.await;
        let _ = tasks.heartbeat.await;

        tracing::debug!("Push transport closed");
    }

    /// Abort every task without waiting
    pub fn abort(&self) {
        self.outgoing.lock().take();
        if let Some(tasks) = self.tasks.lock().take() {
            tasks.reader.abort();
            tasks.writer.abort();
            tasks.heartbeat.abort();
        }
        self.status.send_replace(PushStatus::Closed);
    }

    /// Queue a frame; only a confirmed session accepts client ops
    fn enqueue(&self, message: &GatewayMessage) -> ClientResult<()> {
        if !self.is_confirmed() {
            return Err(ClientError::NotConnected);
        }
        let tx = self.outgoing.lock().clone().ok_or(ClientError::NotConnected)?;
        tx.try_send(text_frame(message)?)
            .map_err(ClientError::transport)
    }
}

#[async_trait]
impl PresenceTransport for PushTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Push
    }

    async fn connect(&self, user_id: &UserId) -> ClientResult<()> {
        if self.status() != PushStatus::Idle {
            return Err(ClientError::Protocol(
                "push transport already connected".to_string(),
            ));
        }

        let (socket, _) = tokio_tungstenite::connect_async(self.url.as_str()).await?;
        let (mut sink, mut stream) = socket.split();

        let hello = read_hello(&mut stream).await?;
        let interval = self
            .heartbeat_interval
            .unwrap_or_else(|| Duration::from_millis(hello.heartbeat_interval))
            .max(Duration::from_millis(1));

        sink.send(text_frame(&GatewayMessage::identify(user_id.as_str()))?)
            .await?;
        self.status.send_replace(PushStatus::Pending);

        tracing::debug!(user_id = %user_id, url = %self.url, "Push transport identified");

        let (tx, mut rx) = mpsc::channel::<WsMessage>(OUTGOING_BUFFER);

        let writer = tokio::spawn(async move {
            while let Some(message) = rx.recv().await {
                let closing = matches!(message, WsMessage::Close(_));
                if sink.send(message).await.is_err() || closing {
                    break;
                }
            }
            let _ = sink.close().await;
        });

        let heartbeat_tx = tx.clone();
        let heartbeat = tokio::spawn(async move {
            let Ok(frame) = GatewayMessage::heartbeat().to_json() else {
                return;
            };
            let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
            loop {
                ticker.tick().await;
                if heartbeat_tx.send(WsMessage::Text(frame.clone())).await.is_err() {
                    break;
                }
            }
        });

        let reader = tokio::spawn(run_reader(
            stream,
            self.events.clone(),
            self.status.clone(),
        ));

        *self.outgoing.lock() = Some(tx);
        *self.tasks.lock() = Some(PushTasks {
            reader,
            writer,
            heartbeat,
        });

        Ok(())
    }

    async fn disconnect(&self, _user_id: &UserId) -> ClientResult<()> {
        self.close().await;
        Ok(())
    }

    async fn update_activity(&self, _user_id: &UserId, activity: &str) -> ClientResult<()> {
        self.enqueue(&GatewayMessage::activity_update(activity))
    }

    async fn send_message(&self, draft: MessageDraft) -> ClientResult<Option<Message>> {
        let payload = SendMessagePayload {
            receiver_id: draft.receiver_id,
            sender_id: Some(draft.sender_id),
            content: draft.content,
        };
        self.enqueue(&GatewayMessage::send_message(&payload))?;
        Ok(None)
    }

    async fn get_online_users(&self) -> ClientResult<PresenceSnapshot> {
        Err(ClientError::Unsupported("get_online_users"))
    }
}

impl std::fmt::Debug for PushTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PushTransport")
            .field("url", &self.url)
            .field("status", &self.status())
            .finish()
    }
}

fn text_frame(message: &GatewayMessage) -> ClientResult<WsMessage> {
    let json = message
        .to_json()
        .map_err(|e| ClientError::Protocol(e.to_string()))?;
    Ok(WsMessage::Text(json))
}

async fn read_hello<S>(stream: &mut S) -> ClientResult<HelloPayload>
where
    S: Stream<Item = Result<WsMessage, WsError>> + Unpin,
{
    while let Some(frame) = stream.next().await {
        match frame? {
            WsMessage::Text(text) => {
                let message =
                    GatewayMessage::parse(&text).map_err(|e| ClientError::Protocol(e.to_string()))?;
                if message.op != OpCode::Hello {
                    return Err(ClientError::Protocol(format!(
                        "expected Hello, got {}",
                        message.op
                    )));
                }
                return message
                    .payload()
                    .map_err(|e| ClientError::Protocol(format!("invalid Hello payload: {e}")));
            }
            WsMessage::Close(_) => break,
            _ => {}
        }
    }

    Err(ClientError::transport("connection closed before Hello"))
}

async fn run_reader<S>(
    mut stream: S,
    events: mpsc::Sender<TransportEvent>,
    status: Arc<watch::Sender<PushStatus>>,
) where
    S: Stream<Item = Result<WsMessage, WsError>> + Unpin,
{
    let mut close_code = None;

    while let Some(frame) = stream.next().await {
        match frame {
            Ok(WsMessage::Text(text)) => match GatewayMessage::parse(&text) {
                Ok(message) => {
                    if !handle_frame(&message, &events, &status).await {
                        return;
                    }
                }
                Err(e) => tracing::warn!(error = %e, "Unreadable push frame"),
            },
            Ok(WsMessage::Close(frame)) => {
                close_code = frame.map(|f| u16::from(f.code));
                break;
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(error = %e, "Push connection error");
                break;
            }
        }
    }

    let confirmed = *status.borrow() == PushStatus::Confirmed;
    status.send_replace(PushStatus::Closed);

    tracing::info!(close_code = ?close_code, confirmed, "Push connection closed");
    let _ = events
        .send(TransportEvent::PushClosed {
            code: close_code,
            confirmed,
        })
        .await;
}

/// Route one frame; returns false once nobody listens for events anymore
async fn handle_frame(
    message: &GatewayMessage,
    events: &mpsc::Sender<TransportEvent>,
    status: &watch::Sender<PushStatus>,
) -> bool {
    match message.op {
        OpCode::Dispatch => {
            let event = match TransportEvent::from_dispatch(message) {
                Ok(Some(event)) => event,
                Ok(None) => return true,
                Err(e) => {
                    tracing::warn!(error = %e, "Dropping malformed dispatch");
                    return true;
                }
            };

            if let TransportEvent::MessageRejected { code, message: reason } = &event {
                tracing::warn!(code = %code, reason = %reason, "Server rejected pushed message");
            }

            let first_snapshot = message.t.as_deref() == Some(GatewayEventType::UsersOnline.as_str())
                && *status.borrow() == PushStatus::Pending;

            if events.send(event).await.is_err() {
                return false;
            }

            if first_snapshot {
                status.send_replace(PushStatus::Confirmed);
                return events.send(TransportEvent::PushConfirmed).await.is_ok();
            }
            true
        }
        OpCode::HeartbeatAck => {
            tracing::trace!("Heartbeat acknowledged");
            true
        }
        op => {
            tracing::debug!(op = %op, "Ignoring unexpected op from server");
            true
        }
    }
}
