use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::{error, warn};

use crate::storage::StorageError;

/// Message shared by every body that is absent, malformed or of the wrong type.
pub const INVALID_JSON: &str = "Invalid JSON data.";

/// Request failures, each rendered as `{"error": <message>}` with its status.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(&'static str),
    #[error("{}", INVALID_JSON)]
    UnsupportedMediaType,
    #[error("{0}")]
    NotFound(&'static str),
    #[error("{0}")]
    Unauthorized(&'static str),
    #[error("{0}")]
    Conflict(&'static str),
    /// Constraint violation raised by an update or delete.
    #[error("Database integrity error")]
    Integrity,
    /// Login without a signing secret. Rendered without the JSON envelope.
    #[error("No secret key set.")]
    MissingSecret,
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Failure of an update or delete: constraint violations become a 500
    /// "Database integrity error", unlike the 409 of the create paths.
    pub fn from_write(err: StorageError) -> Self {
        match err {
            StorageError::ConstraintViolation(reason) => {
                warn!(%reason, "write rejected by constraint");
                AppError::Integrity
            }
            other => AppError::Storage(other),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::UnsupportedMediaType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Integrity
            | AppError::MissingSecret
            | AppError::Storage(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match self {
            AppError::MissingSecret => {
                error!(error = %self, "signing secret is not configured");
                (status, "Internal Server Error").into_response()
            }
            AppError::Storage(ref e) => {
                error!(error = %e, "storage failure");
                (status, Json(json!({ "error": "Internal server error." }))).into_response()
            }
            AppError::Internal(ref e) => {
                error!(error = %e, "internal failure");
                (status, Json(json!({ "error": "Internal server error." }))).into_response()
            }
            other => (status, Json(json!({ "error": other.to_string() }))).into_response(),
        }
    }
}
