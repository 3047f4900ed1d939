//! # presence-api
//!
//! HTTP polling fallback for the presence subsystem, and the server binary
//! that hosts it next to the WebSocket gateway on one port.

pub mod dto;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod response;
pub mod routes;
pub mod server;
pub mod state;

pub use server::{create_app, create_app_state, run, run_server};
pub use state::AppState;
