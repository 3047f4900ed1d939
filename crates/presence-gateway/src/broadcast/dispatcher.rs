//! Event dispatcher
//!
//! Receives events from the service event bus and dispatches them to WebSocket connections.

use crate::connection::ConnectionManager;
use crate::events::{snapshot_frames, ActivityUpdatedPayload, GatewayEventType};
use parking_lot::Mutex;
use presence_core::PresenceEvent;
use presence_service::EventBus;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// Event dispatcher that routes bus events to WebSocket connections
pub struct EventDispatcher {
    /// Connection manager for sending messages
    connection_manager: Arc<ConnectionManager>,
    /// Bus subscription, taken by the run loop on start
    receiver: Mutex<Option<broadcast::Receiver<PresenceEvent>>>,
    /// Run loop handle
    task: Mutex<Option<JoinHandle<()>>>,
}

impl EventDispatcher {
    /// Create a new event dispatcher
    ///
    /// Subscribes immediately, so events published before `start` are not lost.
    pub fn new(events: &EventBus, connection_manager: Arc<ConnectionManager>) -> Self {
        Self {
            connection_manager,
            receiver: Mutex::new(Some(events.subscribe())),
            task: Mutex::new(None),
        }
    }

    /// Start the event dispatcher
    ///
    /// This spawns a background task that receives events from the bus
    /// and dispatches them to appropriate WebSocket connections.
    pub fn start(self: Arc<Self>) {
        let Some(receiver) = self.receiver.lock().take() else {
            tracing::warn!("Event dispatcher is already running");
            return;
        };

        let dispatcher = self.clone();
        let handle = tokio::spawn(async move {
            dispatcher.run(receiver).await;
        });
        *self.task.lock() = Some(handle);

        tracing::info!("Event dispatcher started");
    }

    /// Stop the event dispatcher
    pub fn stop(&self) {
        if let Some(handle) = self.task.lock().take() {
            handle.abort();
            tracing::info!("Event dispatcher stopped");
        }
    }

    /// Check if the run loop is alive
    pub fn is_running(&self) -> bool {
        self.task
            .lock()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Run the event dispatcher loop
    async fn run(&self, mut receiver: broadcast::Receiver<PresenceEvent>) {
        loop {
            match receiver.recv().await {
                Ok(event) => self.handle_event(event),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(lagged = n, "Event dispatcher lagged behind");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::warn!("Event bus closed");
                    break;
                }
            }
        }

        tracing::info!("Event dispatcher loop ended");
    }

    /// Route one event to its connections
    fn handle_event(&self, event: PresenceEvent) {
        tracing::trace!(event = event.kind(), revision = ?event.revision(), "Dispatching event");

        let manager = &self.connection_manager;

        match event {
            PresenceEvent::UserConnected {
                user_id,
                snapshot,
                origin_session,
            } => {
                let exclude = origin_session.as_deref();
                let connected = GatewayEventType::UserConnected
                    .dispatch(json!(user_id))
                    .with_revision(snapshot.revision);

                manager.broadcast(&connected, exclude);
                for frame in snapshot_frames(&snapshot) {
                    manager.broadcast(&frame, exclude);
                }
            }
            PresenceEvent::UserDisconnected { user_id, revision } => {
                let frame = GatewayEventType::UserDisconnected
                    .dispatch(json!(user_id))
                    .with_revision(revision);
                manager.broadcast(&frame, None);
            }
            PresenceEvent::ActivityUpdated {
                user_id,
                activity,
                revision,
            } => {
                let payload = ActivityUpdatedPayload {
                    user_id: user_id.into_inner(),
                    activity,
                };
                let frame = GatewayEventType::ActivityUpdated
                    .dispatch(json!(payload))
                    .with_revision(revision);
                manager.broadcast(&frame, None);
            }
            PresenceEvent::MessageCreated { message } => {
                let data = json!(message);
                let received = manager.send_to_user(
                    message.receiver_id.as_str(),
                    &GatewayEventType::ReceiveMessage.dispatch(data.clone()),
                );
                manager.send_to_user(
                    message.sender_id.as_str(),
                    &GatewayEventType::MessageSent.dispatch(data),
                );

                tracing::debug!(
                    message_id = %message.id,
                    delivered = received,
                    "Message pushed"
                );
            }
        }
    }
}

impl std::fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("running", &self.is_running())
            .finish()
    }
}
