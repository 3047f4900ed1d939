//! Application state
//!
//! Holds the service context shared by both transports, the gateway state and
//! the configuration.

use std::sync::Arc;

use presence_common::AppConfig;
use presence_gateway::server::{create_gateway_state, GatewayState};
use presence_service::ServiceContext;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    /// Stores, relay and event bus
    service_context: ServiceContext,
    /// Push channel state built on the same service context
    gateway: GatewayState,
    /// Application configuration
    config: Arc<AppConfig>,
}

impl AppState {
    /// Create a new AppState
    ///
    /// Starts the gateway's event dispatcher, so this must run inside a Tokio
    /// runtime.
    pub fn new(service_context: ServiceContext, config: AppConfig) -> Self {
        let config = Arc::new(config);
        let gateway = create_gateway_state(service_context.clone(), config.clone());

        Self {
            service_context,
            gateway,
            config,
        }
    }

    /// Get the service context
    pub fn service_context(&self) -> &ServiceContext {
        &self.service_context
    }

    /// Get the gateway state
    pub fn gateway(&self) -> &GatewayState {
        &self.gateway
    }

    /// Get the application configuration
    pub fn config(&self) -> &AppConfig {
        &self.config
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("service_context", &self.service_context)
            .field("gateway", &self.gateway)
            .field("config", &"AppConfig")
            .finish()
    }
}
