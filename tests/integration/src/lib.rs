//! Integration test utilities for the presence server
//!
//! This crate provides helpers for running end-to-end tests against the
//! fallback routes, the gateway, and the client reconciler.

pub mod fixtures;
pub mod helpers;

pub use fixtures::*;
pub use helpers::*;
