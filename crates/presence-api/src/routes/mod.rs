//! Route definitions
//!
//! Fallback routes live under `/websocket`; the gateway is merged in by the
//! server at `/gateway`.

use axum::{
    routing::{any, get, post},
    Router,
};

use crate::handlers::{fallback, health, websocket};
use crate::state::AppState;

/// Create the HTTP router (everything except the gateway upgrade route)
pub fn create_router() -> Router<AppState> {
    Router::new()
        .nest("/websocket", websocket_routes())
        .merge(probe_routes())
        .merge(health_routes())
}

/// Health check routes
pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health::health_check))
}

/// Polling fallback routes
fn websocket_routes() -> Router<AppState> {
    Router::new()
        .route("/connect", post(websocket::connect))
        .route("/disconnect", post(websocket::disconnect))
        .route("/activity", post(websocket::update_activity))
        .route("/message", post(websocket::send_message))
        .route("/users", get(websocket::get_online_users))
        .route("/messages/:user_id/:other_id", get(websocket::get_conversation))
}

/// Socket.IO handshake probes
fn probe_routes() -> Router<AppState> {
    Router::new()
        .route("/socket.io", any(fallback::socket_io_probe))
        .route("/socket.io/", any(fallback::socket_io_probe))
        .route("/socket.io/*rest", any(fallback::socket_io_probe))
}
