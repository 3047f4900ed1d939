//! Gateway server setup
//!
//! Provides the WebSocket route and the state it runs on. The HTTP server that
//! hosts it lives in the api crate.

mod handler;
mod state;

pub use handler::gateway_handler;
pub use state::GatewayState;

use crate::broadcast::EventDispatcher;
use crate::connection::ConnectionManager;
use axum::{routing::get, Router};
use presence_common::AppConfig;
use presence_service::ServiceContext;
use std::sync::Arc;

/// Create the gateway router
pub fn create_router() -> Router<GatewayState> {
    Router::new().route("/gateway", get(gateway_handler))
}

/// Build `GatewayState` and start routing bus events to connections
///
/// Must be called from within a Tokio runtime.
pub fn create_gateway_state(service_context: ServiceContext, config: Arc<AppConfig>) -> GatewayState {
    let connection_manager = ConnectionManager::new_shared();

    let event_dispatcher = Arc::new(EventDispatcher::new(
        service_context.events(),
        connection_manager.clone(),
    ));
    event_dispatcher.clone().start();

    GatewayState::new(service_context, connection_manager, event_dispatcher, config)
}
