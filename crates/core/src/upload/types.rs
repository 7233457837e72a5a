//! Upload session request and response types.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::storage::CompletedPart;

/// Content type used when the client declares none.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Input for starting a multipart upload.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateSessionInput {
    /// Client's original file name; drives key generation.
    pub filename: String,
    /// Declared MIME type.
    #[serde(rename = "type", alias = "contentType", default)]
    pub content_type: String,
    /// Opaque metadata forwarded verbatim to storage.
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    /// Declared total size in bytes, checked against the slot limit.
    #[serde(default)]
    pub size: Option<u64>,
}

impl CreateSessionInput {
    /// Input with just a file name and content type.
    #[must_use]
    pub fn new(filename: impl Into<String>, content_type: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            content_type: content_type.into(),
            ..Self::default()
        }
    }

    /// Content type to send to storage.
    #[must_use]
    pub fn effective_content_type(&self) -> &str {
        let declared = self.content_type.trim();
        if declared.is_empty() {
            DEFAULT_CONTENT_TYPE
        } else {
            declared
        }
    }
}

/// Body of a completion request.
#[derive(Debug, Clone, Deserialize)]
pub struct CompleteInput {
    /// Uploaded parts in any order.
    pub parts: Vec<CompletedPart>,
}

/// One signed part URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignedPart {
    /// Presigned `PUT` URL.
    pub url: String,
}

/// Signed URLs for several parts, keyed by part number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedPartBatch {
    /// Part number (as a string) to presigned URL.
    pub presigned_urls: BTreeMap<String, String>,
}
