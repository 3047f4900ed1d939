//! Event broadcasting
//!
//! Routes events from the service event bus to WebSocket connections.

mod dispatcher;

pub use dispatcher::EventDispatcher;
