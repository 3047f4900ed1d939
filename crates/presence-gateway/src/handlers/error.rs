//! Handler error types

use crate::protocol::CloseCode;
use presence_service::ServiceError;
use thiserror::Error;

/// Handler error type
#[derive(Debug, Error)]
pub enum HandlerError {
    /// Invalid payload received
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    /// Op requires Identify first
    #[error("Not authenticated")]
    NotAuthenticated,

    /// Identify sent twice
    #[error("Already authenticated")]
    AlreadyAuthenticated,

    /// Service error
    #[error("Service error: {0}")]
    ServiceError(#[from] ServiceError),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl HandlerError {
    /// Close code the connection is terminated with
    pub fn to_close_code(&self) -> CloseCode {
        match self {
            Self::InvalidPayload(_) => CloseCode::DecodeError,
            Self::NotAuthenticated => CloseCode::NotAuthenticated,
            Self::AlreadyAuthenticated => CloseCode::AlreadyAuthenticated,
            Self::ServiceError(e) if e.is_validation() => CloseCode::DecodeError,
            Self::ServiceError(_) | Self::Internal(_) => CloseCode::UnknownError,
        }
    }
}

/// Handler result type
pub type HandlerResult<T> = Result<T, HandlerError>;
