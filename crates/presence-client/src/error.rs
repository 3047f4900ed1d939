//! Client error types

use presence_core::UserIdError;
use thiserror::Error;

/// Errors surfaced by the reconciler and its transports
#[derive(Debug, Error)]
pub enum ClientError {
    /// Connection-level failure; recovered by switching transports where possible
    #[error("Transport failure: {0}")]
    Transport(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with an error body
    #[error("Server rejected request ({status} {code}): {message}")]
    Rejected {
        status: u16,
        code: String,
        message: String,
    },

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not connected")]
    NotConnected,

    #[error("{0} is not supported by this transport")]
    Unsupported(&'static str),
}

impl ClientError {
    pub fn transport(msg: impl std::fmt::Display) -> Self {
        Self::Transport(msg.to_string())
    }

    /// Whether the failure happened below the application protocol
    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Http(_))
    }

    /// Whether the server refused the input as invalid
    #[must_use]
    pub fn is_validation(&self) -> bool {
        match self {
            Self::InvalidInput(_) => true,
            Self::Rejected { status, .. } => *status == 400,
            _ => false,
        }
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for ClientError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

impl From<UserIdError> for ClientError {
    fn from(err: UserIdError) -> Self {
        Self::InvalidInput(err.to_string())
    }
}

impl From<presence_core::DomainError> for ClientError {
    fn from(err: presence_core::DomainError) -> Self {
        Self::InvalidInput(err.to_string())
    }
}

/// Result type alias for client operations
pub type ClientResult<T> = Result<T, ClientError>;
