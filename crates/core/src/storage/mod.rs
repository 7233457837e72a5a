//! Object storage for direct-to-bucket uploads.
//!
//! Two seams, both object-safe so services can hold them behind `Arc<dyn _>`:
//!
//! ```text
//! ┌───────────────────────────────┬───────────────────────────────────┐
//! │ MultipartSigner (aws-sdk-s3)  │ ObjectStore (Apache OpenDAL)      │
//! ├───────────────────────────────┼───────────────────────────────────┤
//! │ create_multipart_upload       │ exists(key)                       │
//! │ sign_upload_part (presigned)  │ delete(key)                       │
//! │ list_parts / complete / abort │ presign_download(key, filename)   │
//! └───────────────────────────────┴───────────────────────────────────┘
//! ```

mod config;
mod error;
mod s3;
mod service;
mod signer;

pub use config::{StorageConfig, StorageProvider};
pub use error::{SignerError, StorageError};
pub use s3::S3Signer;
pub use service::{ObjectStore, PresignedUrl, StorageService, content_disposition};
pub use signer::{CompletedPart, CompletedUpload, MultipartSigner, UploadSession, UploadedPart};
