use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use marquee_core::{CatalogError, StorageError};
use serde_json::json;
use std::fmt;
use tracing::error;

pub type Result<T> = std::result::Result<T, AppError>;

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

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, message)
    }

    pub fn gateway_timeout(message: impl Into<String>) -> Self {
        Self::new(StatusCode::GATEWAY_TIMEOUT, message)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

impl From<CatalogError> for AppError {
    fn from(err: CatalogError) -> Self {
        match &err {
            CatalogError::NotFound(id) => Self::not_found(format!("movie {id} not found")),
            CatalogError::Cancelled(_) => Self::gateway_timeout(err.to_string()),
            CatalogError::Store { operation, source } => {
                error!(error = %err, "catalog operation failed");
                match source {
                    StorageError::Timeout(_) | StorageError::Unavailable(_) => {
                        Self::unavailable(format!("{operation} failed: storage unavailable"))
                    }
                    _ => Self::internal(format!("{operation} failed")),
                }
            }
            CatalogError::TaskFailed(_) => {
                error!(error = %err, "catalog task failed");
                Self::internal("internal error")
            }
        }
    }
}
