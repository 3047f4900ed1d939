//! Connection management
//!
//! Tracks every open WebSocket and which user each one belongs to.

mod connection;
mod manager;

pub use connection::{Connection, ConnectionState, Outbound, SendError};
pub use manager::ConnectionManager;
