//! Multipart upload primitives.
//!
//! The signer is a stateless façade over the backend's upload session: each
//! primitive is an independent call keyed by `(key, upload_id)` and nothing is
//! remembered between calls.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::error::SignerError;
use super::service::PresignedUrl;

/// An in-flight multipart upload, as issued by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadSession {
    /// Object key the parts will be combined into.
    pub key: String,
    /// Opaque backend upload identifier.
    pub upload_id: String,
}

/// A part the backend has already received.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedPart {
    /// 1-based part number.
    #[serde(rename = "PartNumber")]
    pub part_number: u32,
    /// Checksum returned by the backend.
    #[serde(rename = "ETag")]
    pub e_tag: String,
    /// Part size in bytes.
    #[serde(rename = "Size", skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

/// A part reference submitted for completion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CompletedPart {
    /// 1-based part number.
    #[serde(alias = "partNumber")]
    pub part_number: u32,
    /// ETag the backend returned for the part upload.
    #[serde(rename = "ETag", alias = "eTag", alias = "etag")]
    pub e_tag: String,
}

impl CompletedPart {
    /// Create a part reference.
    #[must_use]
    pub fn new(part_number: u32, e_tag: impl Into<String>) -> Self {
        Self {
            part_number,
            e_tag: e_tag.into(),
        }
    }
}

/// Result of a completed multipart upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletedUpload {
    /// Final object location reported by the backend.
    pub location: String,
}

/// Backend multipart primitives.
///
/// Implementations must not retry: `create_multipart_upload` is not
/// idempotent, so retry decisions belong to the client.
#[async_trait]
pub trait MultipartSigner: Send + Sync {
    /// Start a multipart upload for `key`.
    async fn create_multipart_upload(
        &self,
        key: &str,
        content_type: &str,
        metadata: &HashMap<String, String>,
    ) -> Result<UploadSession, SignerError>;

    /// Presign a `PUT` URL for one part.
    async fn sign_upload_part(
        &self,
        key: &str,
        upload_id: &str,
        part_number: u32,
    ) -> Result<PresignedUrl, SignerError>;

    /// List parts already uploaded, from marker 0.
    async fn list_parts(&self, key: &str, upload_id: &str)
    -> Result<Vec<UploadedPart>, SignerError>;

    /// Combine parts into the final object. `parts` arrive sorted ascending.
    async fn complete_multipart_upload(
        &self,
        key: &str,
        upload_id: &str,
        parts: &[CompletedPart],
    ) -> Result<CompletedUpload, SignerError>;

    /// Discard all uploaded parts. Aborting an unknown upload succeeds.
    async fn abort_multipart_upload(&self, key: &str, upload_id: &str)
    -> Result<(), SignerError>;
}
