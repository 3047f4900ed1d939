//! Repository traits (ports) - define the interface for data access
//!
//! The domain layer defines what it needs from the storage collaborator, and
//! the infrastructure layer provides the implementation.

use async_trait::async_trait;

use crate::entities::{Message, MessageDraft};
use crate::error::DomainError;

/// Result type for repository operations
pub type RepoResult<T> = Result<T, DomainError>;

// ============================================================================
// Message Repository
// ============================================================================

#[async_trait]
pub trait MessageRepository: Send + Sync {
    /// Persist a validated draft, assigning its id and creation time
    async fn create(&self, draft: &MessageDraft) -> RepoResult<Message>;

    /// Number of persisted messages
    async fn count(&self) -> RepoResult<usize>;
}
