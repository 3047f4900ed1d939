//! # presence-db
//!
//! Storage layer implementing the `MessageRepository` port from `presence-core`.
//!
//! The document store that persists messages in production is an external
//! collaborator. This crate ships the in-process implementation used by the
//! server binary and the test suites.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use presence_core::{MessageDraft, MessageRepository};
//! use presence_db::MemoryMessageRepository;
//!
//! async fn example() -> Result<(), presence_core::DomainError> {
//!     let repo = Arc::new(MemoryMessageRepository::new());
//!     let message = repo.create(&MessageDraft::new("A", "B", "hi")).await?;
//!     Ok(())
//! }
//! ```

pub mod repositories;

// Re-export commonly used types
pub use repositories::MemoryMessageRepository;
