//! Upload session error types.

use thiserror::Error;
use upvault_shared::AppError;

use crate::storage::SignerError;

/// Upload session errors.
#[derive(Debug, Error)]
pub enum UploadError {
    /// Malformed request: bad key, part number, or restricted upload.
    #[error("{0}")]
    Validation(String),

    /// Storage backend rejected or failed a multipart call.
    #[error(transparent)]
    Backend(#[from] SignerError),
}

impl UploadError {
    /// Create a validation error.
    #[must_use]
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}

impl From<UploadError> for AppError {
    fn from(err: UploadError) -> Self {
        match err {
            UploadError::Validation(msg) => Self::Validation(msg),
            UploadError::Backend(e) => e.into(),
        }
    }
}
