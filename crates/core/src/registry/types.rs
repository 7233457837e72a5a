//! File descriptor types.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use upvault_shared::types::RecordId;

use crate::access::{ColumnMapping, FILE_KEY, FILE_NAME, FILE_SIZE, FILE_TYPE};

/// The record that owns an attachment slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OwnerRef {
    /// Resource type name.
    pub resource: String,
    /// Owning record ID.
    pub record_id: RecordId,
}

impl OwnerRef {
    /// Create an owner reference.
    #[must_use]
    pub fn new(resource: impl Into<String>, record_id: RecordId) -> Self {
        Self {
            resource: resource.into(),
            record_id,
        }
    }
}

/// Metadata recorded for an uploaded object.
///
/// Extra fields configured on the slot travel in `file_meta` and are
/// flattened on the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileDescriptor {
    /// Object key. Empty means not yet attached.
    #[serde(default)]
    pub file_key: String,
    /// Original file name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    /// Size in bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
    /// MIME type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_type: Option<String>,
    /// Additional descriptor fields.
    #[serde(flatten)]
    pub file_meta: Map<String, Value>,
}

impl FileDescriptor {
    /// Descriptor with only a key.
    #[must_use]
    pub fn new(file_key: impl Into<String>) -> Self {
        Self {
            file_key: file_key.into(),
            ..Self::default()
        }
    }

    /// Set the original file name.
    #[must_use]
    pub fn with_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }

    /// Whether the descriptor references an object.
    #[must_use]
    pub fn is_attached(&self) -> bool {
        !self.file_key.is_empty()
    }

    /// Value of a logical field, if set.
    #[must_use]
    pub fn logical_value(&self, logical: &str) -> Option<Value> {
        match logical {
            FILE_KEY => Some(Value::String(self.file_key.clone())),
            FILE_NAME => self.file_name.clone().map(Value::String),
            FILE_SIZE => self.file_size.map(Value::from),
            FILE_TYPE => self.file_type.clone().map(Value::String),
            other => self.file_meta.get(other).cloned(),
        }
    }

    fn set_logical(&mut self, logical: &str, value: Value) {
        match logical {
            FILE_KEY => self.file_key = value.as_str().unwrap_or_default().to_string(),
            FILE_NAME => self.file_name = value.as_str().map(String::from),
            FILE_SIZE => {
                self.file_size = value
                    .as_u64()
                    .or_else(|| value.as_str().and_then(|s| s.parse().ok()));
            }
            FILE_TYPE => self.file_type = value.as_str().map(String::from),
            other => {
                self.file_meta.insert(other.to_string(), value);
            }
        }
    }

    /// Project onto storage columns. Fields the mapping does not name are
    /// dropped.
    #[must_use]
    pub fn to_row(&self, columns: &ColumnMapping) -> Map<String, Value> {
        columns
            .iter()
            .filter_map(|(logical, column)| {
                self.logical_value(logical)
                    .filter(|v| !v.is_null())
                    .map(|v| (column.to_string(), v))
            })
            .collect()
    }

    /// Rebuild from storage columns.
    #[must_use]
    pub fn from_row(row: &Map<String, Value>, columns: &ColumnMapping) -> Self {
        let mut descriptor = Self::default();
        for (logical, column) in columns.iter() {
            if let Some(value) = row.get(column).filter(|v| !v.is_null()) {
                descriptor.set_logical(logical, value.clone());
            }
        }
        descriptor
    }

    /// Name to offer when downloading: stored name, else the key's basename.
    #[must_use]
    pub fn download_name(&self) -> &str {
        self.file_name
            .as_deref()
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| crate::upload::base_name(&self.file_key))
    }
}

/// Descriptor as returned by a listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListedFile {
    /// Stored descriptor.
    #[serde(flatten)]
    pub descriptor: FileDescriptor,
    /// Retrieval URL, set for relational slots.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}
