//! # presence-gateway
//!
//! WebSocket push channel: clients identify once and then receive presence
//! and message events as they happen.

pub mod broadcast;
pub mod connection;
pub mod events;
pub mod handlers;
pub mod protocol;
pub mod server;
