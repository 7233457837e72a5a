//! Storage error types.

use thiserror::Error;
use upvault_shared::AppError;

/// Object storage errors.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Object not found in storage.
    #[error("object not found: {key}")]
    NotFound {
        /// Storage key that was not found.
        key: String,
    },

    /// Presign operation not supported by provider.
    #[error("presign operation not supported by storage provider")]
    PresignNotSupported,

    /// Storage provider configuration error.
    #[error("storage configuration error: {0}")]
    Configuration(String),

    /// Backend operation error.
    #[error("storage operation failed: {0}")]
    Operation(String),
}

impl StorageError {
    /// Create a not found error.
    #[must_use]
    pub fn not_found(key: impl Into<String>) -> Self {
        Self::NotFound { key: key.into() }
    }

    /// Create a configuration error.
    #[must_use]
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create an operation error.
    #[must_use]
    pub fn operation(msg: impl Into<String>) -> Self {
        Self::Operation(msg.into())
    }
}

impl From<opendal::Error> for StorageError {
    fn from(err: opendal::Error) -> Self {
        match err.kind() {
            opendal::ErrorKind::NotFound => Self::NotFound {
                key: err.to_string(),
            },
            opendal::ErrorKind::Unsupported => Self::PresignNotSupported,
            _ => Self::Operation(err.to_string()),
        }
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound { .. } => Self::NotFound(err.to_string()),
            StorageError::Configuration(_) => Self::Internal(err.to_string()),
            StorageError::PresignNotSupported | StorageError::Operation(_) => {
                Self::UploadBackend(err.to_string())
            }
        }
    }
}

/// Errors raised by the multipart signer.
///
/// The backend's diagnostic is carried verbatim; nothing is retried.
#[derive(Debug, Error)]
pub enum SignerError {
    /// The storage backend rejected or failed the call.
    #[error("{operation} failed: {message}")]
    Backend {
        /// Multipart primitive that failed.
        operation: &'static str,
        /// Backend diagnostic.
        message: String,
    },

    /// Signer could not be constructed from the storage configuration.
    #[error("signer configuration error: {0}")]
    Configuration(String),
}

impl SignerError {
    /// Create a backend error for a multipart primitive.
    #[must_use]
    pub fn backend(operation: &'static str, message: impl Into<String>) -> Self {
        Self::Backend {
            operation,
            message: message.into(),
        }
    }
}

impl From<SignerError> for AppError {
    fn from(err: SignerError) -> Self {
        match err {
            SignerError::Backend { .. } => Self::UploadBackend(err.to_string()),
            SignerError::Configuration(_) => Self::Internal(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signer_error_carries_backend_message() {
        let err = SignerError::backend("CompleteMultipartUpload", "InvalidPart: part 3 missing");
        assert_eq!(
            err.to_string(),
            "CompleteMultipartUpload failed: InvalidPart: part 3 missing"
        );
        let app: AppError = err.into();
        assert_eq!(app.status_code(), 502);
        assert!(app.to_string().contains("InvalidPart"));
    }

    #[test]
    fn test_storage_not_found_maps_to_404() {
        let app: AppError = StorageError::not_found("docs/a.pdf").into();
        assert_eq!(app.status_code(), 404);
    }
}
