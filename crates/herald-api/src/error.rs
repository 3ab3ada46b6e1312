use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

use herald_core::{ServiceError, ValidationError};
use herald_types::api::ErrorResponse;

/// Every failure a handler can return, rendered as a JSON error body.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Service(#[from] ServiceError),

    /// Query, path or body could not be parsed.
    #[error("{0}")]
    BadRequest(String),

    /// Missing or invalid credentials.
    #[error("{0}")]
    Unauthorized(&'static str),

    #[error("{0}")]
    Internal(String),
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        Self::Service(err.into())
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Service(ServiceError::Validation(_)) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Service(ServiceError::NotFound(_)) => StatusCode::NOT_FOUND,
            Self::Service(ServiceError::Unauthorized) | Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Service(ServiceError::Storage(_)) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        }

        let body = ErrorResponse {
            error: status.canonical_reason().unwrap_or("Error").to_string(),
            error_code: status.as_u16(),
            error_description: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
