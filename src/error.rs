/// Unified error types for the Trolley server
use crate::blob_store::StorageError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Validation error codes surfaced to the client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationCode {
    ListNameEmpty,
    ItemNameEmpty,
    ItemCountEmpty,
    ImageTooLarge,
    ImageTypeNotAllowed,
    EmailInvalid,
    PasswordTooShort,
}

impl ValidationCode {
    /// Machine-readable code used in the error payload
    pub fn code(&self) -> &'static str {
        match self {
            ValidationCode::ListNameEmpty => "LIST_NAME_EMPTY",
            ValidationCode::ItemNameEmpty => "ITEM_NAME_EMPTY",
            ValidationCode::ItemCountEmpty => "ITEM_COUNT_EMPTY",
            ValidationCode::ImageTooLarge => "IMAGE_TOO_LARGE",
            ValidationCode::ImageTypeNotAllowed => "IMAGE_TYPE_NOT_ALLOWED",
            ValidationCode::EmailInvalid => "EMAIL_INVALID",
            ValidationCode::PasswordTooShort => "PASSWORD_TOO_SHORT",
        }
    }

    /// Which request field the code refers to
    pub fn field(&self) -> &'static str {
        match self {
            ValidationCode::ListNameEmpty | ValidationCode::ItemNameEmpty => "name",
            ValidationCode::ItemCountEmpty => "count",
            ValidationCode::ImageTooLarge | ValidationCode::ImageTypeNotAllowed => "file",
            ValidationCode::EmailInvalid => "email",
            ValidationCode::PasswordTooShort => "password",
        }
    }
}

/// Main error type for the server
#[derive(Error, Debug)]
pub enum ApiError {
    /// Database errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Authentication errors
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Authorization errors
    #[error("Not authorized: {0}")]
    Forbidden(String),

    /// Item lookup failed
    #[error("Item not found")]
    ItemNotFound,

    /// Image lookup failed
    #[error("Image not found")]
    ImageNotFound,

    /// List lookup failed
    #[error("List not found")]
    ListNotFound,

    /// No registered user with the given email
    #[error("No user with that email")]
    EmailNotFound,

    /// Validation errors
    #[error("Validation error: {}", .0.code())]
    Validation(ValidationCode),

    /// Email already registered
    #[error("Email already registered")]
    EmailTaken,

    /// List already shared with the target user
    #[error("List already shared with that user")]
    AlreadyShared,

    /// Concurrent image uploads raced on the same item
    #[error("Concurrent image upload for the same item")]
    ImageConflict,

    /// Blob storage errors
    #[error("Blob storage error: {0}")]
    Storage(#[from] StorageError),

    /// An image row exists but its blob is gone (broken invariant)
    #[error("Blob missing for image record {image_id}")]
    BlobMissing { image_id: i64 },

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal server errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error response format consumed by the frontend
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub field: String,
    pub code: String,
}

/// Convert ApiError to HTTP response
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, field, code) = match &self {
            ApiError::Authentication(_) => {
                (StatusCode::UNAUTHORIZED, "user", "NOT_AUTHENTICATED")
            }
            ApiError::Forbidden(_) => (StatusCode::FORBIDDEN, "user", "FORBIDDEN"),
            ApiError::ItemNotFound => (StatusCode::NOT_FOUND, "item", "ITEM_NOT_FOUND"),
            ApiError::ImageNotFound => (StatusCode::NOT_FOUND, "image", "IMAGE_NOT_FOUND"),
            ApiError::ListNotFound => (StatusCode::NOT_FOUND, "list", "LIST_NOT_FOUND"),
            ApiError::EmailNotFound => (StatusCode::NOT_FOUND, "email", "EMAIL_NOT_FOUND"),
            ApiError::Validation(c) => (StatusCode::BAD_REQUEST, c.field(), c.code()),
            ApiError::EmailTaken => (StatusCode::CONFLICT, "email", "EMAIL_ALREADY_EXISTS"),
            ApiError::AlreadyShared => (StatusCode::CONFLICT, "email", "LIST_ALREADY_SHARED"),
            ApiError::ImageConflict => (StatusCode::CONFLICT, "file", "IMAGE_UPLOAD_CONFLICT"),
            ApiError::Database(_)
            | ApiError::Storage(_)
            | ApiError::BlobMissing { .. }
            | ApiError::Io(_)
            | ApiError::Internal(_) => {
                // Don't leak details to the client
                tracing::error!(error = %self, "internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "server", "INTERNAL")
            }
        };

        let body = Json(ErrorBody {
            field: field.to_string(),
            code: code.to_string(),
        });

        (status, body).into_response()
    }
}

/// Result type alias for server operations
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_codes_map_to_fields() {
        assert_eq!(ValidationCode::ImageTooLarge.code(), "IMAGE_TOO_LARGE");
        assert_eq!(ValidationCode::ImageTooLarge.field(), "file");
        assert_eq!(
            ValidationCode::ImageTypeNotAllowed.code(),
            "IMAGE_TYPE_NOT_ALLOWED"
        );
        assert_eq!(ValidationCode::ListNameEmpty.field(), "name");
    }

    #[test]
    fn status_codes_follow_taxonomy() {
        let resp = ApiError::ItemNotFound.into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let resp = ApiError::Forbidden("not the owner".to_string()).into_response();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        let resp = ApiError::Validation(ValidationCode::ImageTooLarge).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = ApiError::ImageConflict.into_response();
        assert_eq!(resp.status(), StatusCode::CONFLICT);

        let resp = ApiError::BlobMissing { image_id: 1 }.into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
