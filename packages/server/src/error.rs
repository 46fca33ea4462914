use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use media::UploadError;
use serde::Serialize;

use crate::repository::RepoError;

/// Structured error response returned by all endpoints on failure.
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorBody {
    /// Always `false` on error responses.
    #[schema(example = false)]
    pub success: bool,
    /// Machine-readable error code. One of: `VALIDATION_ERROR`, `CONFLICT`,
    /// `TOKEN_MISSING`, `TOKEN_INVALID`, `INVALID_CREDENTIALS`, `FORBIDDEN`,
    /// `NOT_FOUND`, `PAYLOAD_TOO_LARGE`, `UNSUPPORTED_MEDIA_TYPE`,
    /// `CONFIGURATION_ERROR`, `MEDIA_PROCESSING_ERROR`, `INTERNAL_ERROR`.
    #[schema(example = "VALIDATION_ERROR")]
    pub code: &'static str,
    /// Human-readable error description.
    #[schema(example = "Title must be 1-256 characters")]
    pub message: String,
}

/// Application-level error type.
#[derive(Debug)]
pub enum AppError {
    Validation(String),
    /// Duplicate username or email.
    Conflict(String),
    TokenMissing,
    TokenInvalid,
    InvalidCredentials,
    Forbidden(String),
    NotFound(String),
    PayloadTooLarge(String),
    UnsupportedMediaType(String),
    /// Object storage is missing settings or rejects them. Detail is logged only.
    Configuration(String),
    /// Transcoding or storage failed. Detail is logged only.
    MediaProcessing(String),
    Internal(String),
}

impl AppError {
    fn body(code: &'static str, message: impl Into<String>) -> ErrorBody {
        ErrorBody {
            success: false,
            code,
            message: message.into(),
        }
    }

    fn status_and_body(self) -> (StatusCode, ErrorBody) {
        match self {
            AppError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                Self::body("VALIDATION_ERROR", msg),
            ),
            AppError::Conflict(msg) => (StatusCode::BAD_REQUEST, Self::body("CONFLICT", msg)),
            AppError::TokenMissing => (
                StatusCode::UNAUTHORIZED,
                Self::body("TOKEN_MISSING", "Authentication required"),
            ),
            AppError::TokenInvalid => (
                StatusCode::UNAUTHORIZED,
                Self::body("TOKEN_INVALID", "Invalid or expired token"),
            ),
            AppError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                Self::body("INVALID_CREDENTIALS", "Invalid username or password"),
            ),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, Self::body("FORBIDDEN", msg)),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, Self::body("NOT_FOUND", msg)),
            AppError::PayloadTooLarge(msg) => (
                StatusCode::PAYLOAD_TOO_LARGE,
                Self::body("PAYLOAD_TOO_LARGE", msg),
            ),
            AppError::UnsupportedMediaType(msg) => (
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                Self::body("UNSUPPORTED_MEDIA_TYPE", msg),
            ),
            AppError::Configuration(detail) => {
                tracing::error!("Storage configuration error: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Self::body("CONFIGURATION_ERROR", "Server configuration error"),
                )
            }
            AppError::MediaProcessing(detail) => {
                tracing::error!("Media processing error: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Self::body("MEDIA_PROCESSING_ERROR", "Error processing uploaded media"),
                )
            }
            AppError::Internal(detail) => {
                tracing::error!("Internal error: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Self::body("INTERNAL_ERROR", "An unexpected error occurred"),
                )
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = self.status_and_body();
        (status, Json(body)).into_response()
    }
}

impl From<RepoError> for AppError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::Conflict(detail) => {
                tracing::debug!("Unique constraint violated: {detail}");
                AppError::Conflict("Username or email already exists".into())
            }
            RepoError::Backend(detail) => AppError::Internal(detail),
        }
    }
}

impl From<UploadError> for AppError {
    fn from(err: UploadError) -> Self {
        match err {
            UploadError::InvalidRequest(msg) => AppError::Validation(msg),
            e @ UploadError::PayloadTooLarge { .. } => AppError::PayloadTooLarge(e.to_string()),
            UploadError::UnsupportedMediaType(mime) => AppError::UnsupportedMediaType(format!(
                "Unsupported file type '{mime}'. Allowed: JPEG, PNG, GIF, MP4, MOV, AVI, WebM"
            )),
            UploadError::Configuration(detail) => AppError::Configuration(detail),
            UploadError::Processing(cause) => AppError::MediaProcessing(cause.to_string()),
        }
    }
}
