//! Server setup and initialization
//!
//! Provides the application builder and server runner. The fallback routes
//! and the gateway share one listener and one service context.

use std::net::SocketAddr;

use axum::Router;
use presence_common::{AppConfig, AppError};
use presence_service::ServiceContextBuilder;
use tokio::net::TcpListener;
use tracing::info;

use crate::handlers::fallback;
use crate::middleware::apply_middleware;
use crate::routes::create_router;
use crate::state::AppState;

/// Build the complete Axum application with all routes and middleware
pub fn create_app(state: AppState) -> Router {
    let gateway = presence_gateway::server::create_router().with_state(state.gateway().clone());

    let router = create_router()
        .merge(gateway)
        .fallback(fallback::not_found);

    let config = state.config();
    let router = apply_middleware(router, &config.cors, config.app.env.is_production());

    router.with_state(state)
}

/// Create AppState backed by the in-memory message store
///
/// Must be called from within a Tokio runtime.
pub fn create_app_state(config: AppConfig) -> AppState {
    let service_context = ServiceContextBuilder::new()
        .event_bus_capacity(config.events.capacity)
        .conversation_capacity(config.relay.conversation_capacity)
        .build();

    AppState::new(service_context, config)
}

/// Serve on an already-bound listener
pub async fn run_server(app: Router, listener: TcpListener) -> Result<(), AppError> {
    let addr = listener.local_addr()?;

    info!("Server listening on http://{}", addr);
    info!("Gateway available at ws://{}/gateway", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Run the complete server with configuration
pub async fn run(config: AppConfig) -> Result<(), AppError> {
    let addr: SocketAddr = config
        .server
        .address()
        .parse()
        .map_err(|e| AppError::Config(format!("Invalid server address: {e}")))?;

    let state = create_app_state(config);
    let app = create_app(state);

    let listener = TcpListener::bind(addr).await.map_err(|e| {
        tracing::error!(address = %addr, error = %e, "Failed to bind listener");
        AppError::from(e)
    })?;

    run_server(app, listener).await
}
