//! Application-wide error types.

use thiserror::Error;

/// Result type alias using `AppError`.
pub type AppResult<T> = Result<T, AppError>;

/// Application error types.
#[derive(Debug, Error)]
pub enum AppError {
    /// Authentication failed.
    #[error("Authentication failed: {0}")]
    Unauthorized(String),

    /// Capability not granted for the attachment slot.
    #[error("Access denied: {0}")]
    Forbidden(String),

    /// Slot, record, descriptor, or object not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Malformed request or descriptor.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Object storage rejected or failed a call.
    #[error("Upload backend error: {0}")]
    UploadBackend(String),

    /// Database error.
    #[error("Database error: {0}")]
    Database(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::Unauthorized(_) => 401,
            Self::Forbidden(_) => 403,
            Self::NotFound(_) => 404,
            Self::Validation(_) => 400,
            Self::UploadBackend(_) => 502,
            Self::Database(_) | Self::Internal(_) => 500,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::UploadBackend(_) => "UPLOAD_BACKEND_ERROR",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Whether the message may be shown to the caller verbatim.
    ///
    /// Database and internal failures are logged but replaced with a generic
    /// message in responses.
    #[must_use]
    pub const fn is_client_visible(&self) -> bool {
        !matches!(self, Self::Database(_) | Self::Internal(_))
    }
}
