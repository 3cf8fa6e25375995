// HTTP error handling

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Result type for HTTP handlers
pub type AppResult<T> = Result<T, AppError>;

/// Application error with HTTP status code
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message)
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.status, self.message)
    }
}

impl std::error::Error for AppError {}

/// Error response JSON structure
#[derive(Debug, Serialize, Deserialize)]
struct ErrorResponse {
    error: String,
    status: u16,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status;
        let body = Json(ErrorResponse {
            error: self.message,
            status: status.as_u16(),
        });

        (status, body).into_response()
    }
}

/// Convert voto_core errors to HTTP errors
impl From<voto_core::Error> for AppError {
    fn from(err: voto_core::Error) -> Self {
        use voto_core::Error;

        let message = err.client_message().to_string();
        match err {
            Error::Authentication(_) => Self::unauthorized(message),
            Error::Authorization(_) => Self::forbidden(message),
            Error::NotFound(_) => Self::not_found(message),
            Error::AlreadyExists(_) => Self::conflict(message),
            Error::InvalidInput(_) => Self::bad_request(message),
            Error::Storage(e) => {
                tracing::error!("Storage error: {}", e);
                Self::internal_server_error(message)
            }
            Error::Database(e) => {
                tracing::error!("Database error: {}", e);
                Self::internal_server_error(message)
            }
            Error::Redis(e) => {
                tracing::error!("Redis error: {}", e);
                Self::internal_server_error(message)
            }
            Error::Serialization(e) => {
                tracing::error!("Serialization error: {}", e);
                Self::internal_server_error(message)
            }
            Error::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                Self::internal_server_error(message)
            }
        }
    }
}

/// Storage failures on media routes surface as `ER_S3_DELETE`
pub fn storage_delete_error(err: voto_core::Error) -> AppError {
    match err {
        voto_core::Error::Storage(e) => {
            tracing::error!("Object delete failed: {}", e);
            AppError::internal_server_error("ER_S3_DELETE")
        }
        other => other.into(),
    }
}
