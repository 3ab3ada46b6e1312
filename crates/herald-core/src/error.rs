//! Error types for the message core.

use thiserror::Error;

use crate::ports::StorageError;

/// Malformed input, rejected before storage or notifier are touched.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("limit must be between {min} and {max}, got {got}")]
    LimitOutOfRange { got: i64, min: u32, max: u32 },

    #[error("since must not be negative, got {0}")]
    NegativeSince(i64),

    #[error("id must be a positive integer, got {0}")]
    InvalidId(i64),

    #[error("message must not be empty")]
    EmptyMessage,
}

impl ValidationError {
    /// Accepts a raw path id only if it is strictly positive.
    pub fn check_id(raw: i64) -> Result<i64, Self> {
        if raw > 0 { Ok(raw) } else { Err(Self::InvalidId(raw)) }
    }
}

/// What a caller is told was not found. Ownership failures map here too, so
/// a foreign resource is indistinguishable from a missing one.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum NotFound {
    #[error("application does not exist")]
    Application,

    #[error("message does not exist")]
    Message,
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    NotFound(#[from] NotFound),

    /// The application token did not resolve to an application.
    #[error("unknown application token")]
    Unauthorized,

    #[error(transparent)]
    Storage(#[from] StorageError),
}

pub type ServiceResult<T> = Result<T, ServiceError>;
