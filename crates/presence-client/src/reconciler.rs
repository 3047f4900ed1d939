//! Client reconciler
//!
//! Runs the push transport and, when it cannot be confirmed in time, the
//! polling fallback next to it. Every inbound event from either transport goes
//! through one channel into a single merge task that owns all writes to the
//! [`StateStore`].

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::state::{ClientState, ConnectionMode, StateStore};
use crate::transport::{PollingTransport, PresenceTransport, PushTransport, TransportEvent};
use parking_lot::Mutex;
use presence_core::{Message, MessageDraft, PresenceSnapshot, UserId};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Everything owned by one `connect` .. `disconnect` span
struct Session {
    user_id: UserId,
    push: Arc<PushTransport>,
    fallback: Arc<PollingTransport>,
    store: Arc<StateStore>,
    config: ClientConfig,
    live: AtomicBool,
    fallback_active: AtomicBool,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl Session {
    /// Track a task; aborts it right away if the session already ended
    fn track(&self, handle: JoinHandle<()>) {
        let mut tasks = self.tasks.lock();
        if self.live.load(Ordering::SeqCst) {
            tasks.retain(|t| !t.is_finished());
            tasks.push(handle);
        } else {
            handle.abort();
        }
    }

    /// Connect the fallback and start polling; no-op when already active
    async fn activate_fallback(self: &Arc<Self>) -> ClientResult<()> {
        if self.fallback_active.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        tracing::info!(user_id = %self.user_id, "Activating polling fallback");

        if let Err(e) = self.fallback.connect(&self.user_id).await {
            self.fallback_active.store(false, Ordering::SeqCst);
            return Err(e);
        }

        if !self.push.is_confirmed() {
            self.store.set_mode(ConnectionMode::Fallback);
        }

        let poll = tokio::spawn(self.fallback.clone().poll_loop(self.config.poll_interval()));
        self.track(poll);
        Ok(())
    }

    /// React to the push socket going away
    fn push_lost(self: &Arc<Self>, code: Option<u16>, confirmed: bool) {
        if !self.live.load(Ordering::SeqCst) {
            return;
        }

        if self.fallback_active.load(Ordering::SeqCst) {
            self.store.set_mode(ConnectionMode::Fallback);
            return;
        }
        if !confirmed {
            return;
        }

        tracing::warn!(user_id = %self.user_id, close_code = ?code, "Push connection lost");
        self.store.set_mode(ConnectionMode::Disconnected);

        let session = self.clone();
        self.track(tokio::spawn(async move {
            if let Err(e) = session.activate_fallback().await {
                tracing::warn!(error = %e, "Fallback activation failed after push loss");
            }
        }));
    }

    /// Stop every task, close the socket and announce the user offline
    async fn shutdown(&self) {
        self.live.store(false, Ordering::SeqCst);

        let tasks: Vec<JoinHandle<()>> = std::mem::take(&mut *self.tasks.lock());
        for task in &tasks {
            task.abort();
        }
        for task in tasks {
            let _ = task.await;
        }

        self.push.close().await;

        if let Err(e) = self.fallback.disconnect(&self.user_id).await {
            tracing::warn!(user_id = %self.user_id, error = %e, "Fallback disconnect failed");
        }

        self.store.reset_presence();
        tracing::info!(user_id = %self.user_id, "Session ended");
    }

    fn abort(&self) {
        self.live.store(false, Ordering::SeqCst);
        for task in self.tasks.lock().drain(..) {
            task.abort();
        }
        self.push.abort();
    }
}

/// Merge loop: the only consumer of transport events
async fn run_merge(session: Arc<Session>, mut events: mpsc::Receiver<TransportEvent>) {
    while let Some(event) = events.recv().await {
        tracing::trace!(event = event.kind(), "Merging transport event");

        match &event {
            TransportEvent::PushConfirmed => {
                session.store.set_mode(ConnectionMode::Push);
            }
            TransportEvent::PushClosed { code, confirmed } => {
                session.push_lost(*code, *confirmed);
            }
            _ => {}
        }

        session.store.apply(&event);
    }
}

/// Client-side entry point
pub struct Reconciler {
    config: ClientConfig,
    http: reqwest::Client,
    store: Arc<StateStore>,
    session: Mutex<Option<Arc<Session>>>,
}

impl Reconciler {
    pub fn new(config: ClientConfig) -> ClientResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self {
            config,
            http,
            store: Arc::new(StateStore::new()),
            session: Mutex::new(None),
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Watch the reconciled state
    pub fn subscribe(&self) -> watch::Receiver<ClientState> {
        self.store.subscribe()
    }

    pub fn state(&self) -> ClientState {
        self.store.current()
    }

    /// The store behind [`Reconciler::subscribe`]
    pub fn store(&self) -> &StateStore {
        &self.store
    }

    pub fn connection_mode(&self) -> ConnectionMode {
        self.store.mode()
    }

    fn current(&self) -> ClientResult<Arc<Session>> {
        self.session.lock().clone().ok_or(ClientError::NotConnected)
    }

    /// Go online as `user_id`
    ///
    /// Returns once one transport is confirmed. The push attempt keeps running
    /// in the background after the fallback takes over, and takes over again
    /// if it confirms later. An existing session is ended first.
    pub async fn connect(&self, user_id: &str) -> ClientResult<ConnectionMode> {
        let user_id = UserId::new(user_id)?;
        self.disconnect().await;

        let (events_tx, events_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let session = Arc::new(Session {
            push: Arc::new(PushTransport::new(
                self.config.gateway_url.clone(),
                self.config.heartbeat_interval(),
                events_tx.clone(),
            )),
            fallback: Arc::new(PollingTransport::new(
                self.http.clone(),
                &self.config.base_url,
                events_tx,
            )?),
            user_id,
            store: self.store.clone(),
            config: self.config.clone(),
            live: AtomicBool::new(true),
            fallback_active: AtomicBool::new(false),
            tasks: Mutex::new(Vec::new()),
        });
        *self.session.lock() = Some(session.clone());

        session.track(tokio::spawn(run_merge(session.clone(), events_rx)));

        let (result_tx, result_rx) = oneshot::channel();
        let attempt = session.clone();
        session.track(tokio::spawn(async move {
            let result = match attempt.push.connect(&attempt.user_id).await {
                Ok(()) => attempt.push.wait_confirmed().await,
                Err(e) => Err(e),
            };
            let _ = result_tx.send(result);
        }));

        let timer = tokio::time::sleep(self.config.handshake_timeout());
        let outcome = tokio::select! {
            result = result_rx => Some(result.unwrap_or_else(|_| Err(ClientError::transport("push attempt cancelled")))),
            () = timer => None,
        };

        match outcome {
            Some(Ok(())) => {
                session.store.set_mode(ConnectionMode::Push);
                tracing::info!(user_id = %session.user_id, "Connected over push");
                return Ok(ConnectionMode::Push);
            }
            Some(Err(e)) => {
                tracing::warn!(user_id = %session.user_id, error = %e, "Push connection failed");
            }
            None => {
                tracing::warn!(
                    user_id = %session.user_id,
                    timeout_ms = self.config.handshake_timeout_ms,
                    "Push handshake timed out"
                );
            }
        }

        if let Err(e) = session.activate_fallback().await {
            tracing::warn!(user_id = %session.user_id, error = %e, "Fallback connection failed");
            self.disconnect().await;
            return Err(e);
        }

        Ok(self.store.mode())
    }

    /// Send a message to `receiver_id`
    ///
    /// Uses the push socket once its handshake is confirmed; otherwise, or if
    /// enqueueing fails, the fallback request. A message stored over the
    /// fallback is added to the state immediately and returned. A later
    /// server-side rejection of a pushed message shows up as
    /// [`ClientState::last_send_error`].
    pub async fn send_message(&self, receiver_id: &str, content: &str) -> ClientResult<Option<Message>> {
        let session = self.current()?;
        let draft = MessageDraft::new(session.user_id.as_str(), receiver_id, content);
        draft.check()?;

        self.store.clear_send_error();

        if session.push.is_confirmed() {
            match session.push.send_message(draft.clone()).await {
                Ok(_) => return Ok(None),
                Err(e) => tracing::warn!(error = %e, "Push send failed, using fallback"),
            }
        }

        let message = session.fallback.send_message(draft).await?;
        if let Some(message) = &message {
            self.store.append_message(message.clone());
        }
        Ok(message)
    }

    /// Publish a new activity; failures are logged, never returned
    pub async fn update_activity(&self, activity: &str) {
        let Ok(session) = self.current() else {
            tracing::warn!("Activity update while not connected");
            return;
        };

        if session.push.is_confirmed() {
            match session.push.update_activity(&session.user_id, activity).await {
                Ok(()) => return,
                Err(e) => tracing::warn!(error = %e, "Push activity update failed, using fallback"),
            }
        }

        if let Err(e) = session.fallback.update_activity(&session.user_id, activity).await {
            tracing::warn!(user_id = %session.user_id, error = %e, "Activity update failed");
        }
    }

    /// Fetch a fresh snapshot over HTTP and merge it
    pub async fn get_online_users(&self) -> ClientResult<PresenceSnapshot> {
        let session = self.current()?;
        let snapshot = session.fallback.get_online_users().await?;
        self.store.apply_snapshot(&snapshot);
        Ok(snapshot)
    }

    /// Replace the message list with the conversation with `other_user_id`
    pub async fn fetch_messages(&self, other_user_id: &str) -> ClientResult<Vec<Message>> {
        let session = self.current()?;
        let messages = session
            .fallback
            .conversation(session.user_id.as_str(), other_user_id)
            .await?;
        self.store.replace_messages(messages.clone());
        Ok(messages)
    }

    /// End the session
    ///
    /// Stops every task, closes the push socket and independently tells the
    /// fallback the user left. Nothing mutates the state afterwards.
    pub async fn disconnect(&self) {
        let session = self.session.lock().take();
        if let Some(session) = session {
            session.shutdown().await;
        }
    }
}

impl Drop for Reconciler {
    fn drop(&mut self) {
        if let Some(session) = self.session.get_mut().take() {
            session.abort();
        }
    }
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("base_url", &self.config.base_url)
            .field("mode", &self.store.mode())
            .finish()
    }
}
