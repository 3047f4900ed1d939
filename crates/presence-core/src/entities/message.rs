//! Message entity - a direct message between two users

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::error::DomainError;
use crate::value_objects::UserId;

/// Persisted direct message
///
/// Immutable once created. `id` and `created_at` are assigned by the storage
/// collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: Uuid,
    pub sender_id: UserId,
    pub receiver_id: UserId,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// Build a message from a draft, assigning a fresh id and timestamp
    pub fn from_draft(draft: &MessageDraft) -> Result<Self, DomainError> {
        draft.check()?;

        Ok(Self {
            id: Uuid::new_v4(),
            sender_id: UserId::new(draft.sender_id.clone())?,
            receiver_id: UserId::new(draft.receiver_id.clone())?,
            content: draft.content.clone(),
            created_at: Utc::now(),
        })
    }

    /// Check whether this message belongs to the conversation between `a` and `b`
    pub fn is_between(&self, a: &str, b: &str) -> bool {
        let (s, r) = (self.sender_id.as_str(), self.receiver_id.as_str());
        (s == a && r == b) || (s == b && r == a)
    }

    /// Check whether the given user sent or received this message
    #[inline]
    pub fn involves(&self, user_id: &str) -> bool {
        self.sender_id.as_str() == user_id || self.receiver_id.as_str() == user_id
    }
}

/// Unvalidated input of a send
///
/// Missing fields deserialize as empty strings so that they surface as
/// validation errors instead of decode errors.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct MessageDraft {
    #[serde(default)]
    #[validate(length(min = 1, message = "senderId is required"))]
    pub sender_id: String,

    #[serde(default)]
    #[validate(length(min = 1, message = "receiverId is required"))]
    pub receiver_id: String,

    #[serde(default)]
    #[validate(length(min = 1, message = "content is required"))]
    pub content: String,
}

impl MessageDraft {
    pub fn new(
        sender_id: impl Into<String>,
        receiver_id: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            sender_id: sender_id.into(),
            receiver_id: receiver_id.into(),
            content: content.into(),
        }
    }

    /// Run field validation, mapping failures into a domain error
    pub fn check(&self) -> Result<(), DomainError> {
        self.validate()
            .map_err(|e| DomainError::Validation(describe(&e)))?;

        if self.sender_id.trim().is_empty() || self.receiver_id.trim().is_empty() {
            return Err(DomainError::Validation(
                "senderId and receiverId must not be blank".to_string(),
            ));
        }

        Ok(())
    }
}

/// Flatten validator output into "field: message" pairs
fn describe(errors: &validator::ValidationErrors) -> String {
    let mut parts: Vec<String> = errors
        .field_errors()
        .iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| match &e.message {
                Some(msg) => msg.to_string(),
                None => format!("{field} is invalid"),
            })
        })
        .collect();
    parts.sort();
    parts.join(", ")
}
