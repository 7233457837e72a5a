//! File registry error types.

use thiserror::Error;
use upvault_shared::AppError;

use crate::storage::StorageError;

/// File registry errors.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Owning record does not exist.
    #[error("record not found: {resource}/{record_id}")]
    RecordNotFound {
        /// Resource type.
        resource: String,
        /// Record ID.
        record_id: String,
    },

    /// No descriptor with this key on the slot.
    #[error("file not found: {0}")]
    DescriptorNotFound(String),

    /// Descriptor exists but the object is gone from storage.
    #[error("file not found in storage: {0}")]
    ObjectNotFound(String),

    /// Malformed descriptor.
    #[error("{0}")]
    Validation(String),

    /// Storage operation failed.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Repository operation failed.
    #[error("repository error: {0}")]
    Repository(String),
}

impl RegistryError {
    /// Create a validation error.
    #[must_use]
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a repository error.
    #[must_use]
    pub fn repository(msg: impl Into<String>) -> Self {
        Self::Repository(msg.into())
    }
}

impl From<RegistryError> for AppError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::RecordNotFound { .. }
            | RegistryError::DescriptorNotFound(_)
            | RegistryError::ObjectNotFound(_) => Self::NotFound(err.to_string()),
            RegistryError::Validation(msg) => Self::Validation(msg),
            RegistryError::Storage(e) => e.into(),
            RegistryError::Repository(msg) => Self::Database(msg),
        }
    }
}
