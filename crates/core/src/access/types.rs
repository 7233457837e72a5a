//! Attachment slot configuration types.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// Logical descriptor field holding the object key.
pub const FILE_KEY: &str = "file_key";
/// Logical descriptor field holding the original file name.
pub const FILE_NAME: &str = "file_name";
/// Logical descriptor field holding the size in bytes.
pub const FILE_SIZE: &str = "file_size";
/// Logical descriptor field holding the MIME type.
pub const FILE_TYPE: &str = "file_type";

/// Operation a principal may perform on a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// List descriptors.
    View,
    /// Drive multipart sessions and persist descriptors.
    Upload,
    /// Obtain a download URL.
    Download,
    /// Delete an object and its descriptor.
    Delete,
}

impl Capability {
    /// Convert to configuration string value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::View => "view",
            Self::Upload => "upload",
            Self::Download => "download",
            Self::Delete => "delete",
        }
    }

    /// Parse from configuration string value.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "view" => Some(Self::View),
            "upload" => Some(Self::Upload),
            "download" => Some(Self::Download),
            "delete" => Some(Self::Delete),
            _ => None,
        }
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How descriptors attach to the owning record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cardinality {
    /// One descriptor stored as a structured value on the record's field.
    Single,
    /// Ordered list of descriptors stored on the record's field.
    Multiple,
    /// Related rows; storing replaces every prior row.
    RelationalOne,
    /// Related rows; storing appends.
    RelationalMany,
}

impl Cardinality {
    /// Convert to configuration string value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Single => "single",
            Self::Multiple => "multiple",
            Self::RelationalOne => "relational_one",
            Self::RelationalMany => "relational_many",
        }
    }

    /// Parse from configuration string value.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "single" => Some(Self::Single),
            "multiple" => Some(Self::Multiple),
            "relational_one" => Some(Self::RelationalOne),
            "relational_many" => Some(Self::RelationalMany),
            _ => None,
        }
    }

    /// Whether descriptors live in a related table.
    #[must_use]
    pub const fn is_relational(&self) -> bool {
        matches!(self, Self::RelationalOne | Self::RelationalMany)
    }
}

/// Ordered mapping from logical descriptor field to storage column.
///
/// Only built by the catalog, which guarantees a `file_key` entry and unique
/// logical names and columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMapping {
    entries: Vec<(String, String)>,
}

impl ColumnMapping {
    pub(crate) fn new_unchecked(entries: Vec<(String, String)>) -> Self {
        Self { entries }
    }

    /// Identity mapping for the four core descriptor fields.
    #[must_use]
    pub fn standard() -> Self {
        Self::new_unchecked(
            [FILE_KEY, FILE_NAME, FILE_SIZE, FILE_TYPE]
                .into_iter()
                .map(|f| (f.to_string(), f.to_string()))
                .collect(),
        )
    }

    /// Storage column for a logical field.
    #[must_use]
    pub fn column(&self, logical: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(l, _)| l == logical)
            .map(|(_, c)| c.as_str())
    }

    /// Storage column holding the object key.
    #[must_use]
    pub fn file_key_column(&self) -> &str {
        self.column(FILE_KEY).unwrap_or(FILE_KEY)
    }

    /// Iterate `(logical, column)` pairs in configured order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(l, c)| (l.as_str(), c.as_str()))
    }
}

/// Validated configuration for one attachment slot.
#[derive(Debug, Clone)]
pub struct SlotConfig {
    /// Slot (field) name.
    pub name: String,
    /// Storage backend identifier.
    pub disk: String,
    /// Prefix for generated object keys, without surrounding slashes.
    pub path_prefix: Option<String>,
    /// Keep the client's file name instead of generating an opaque one.
    pub preserve_filename: bool,
    /// Attachment cardinality.
    pub cardinality: Cardinality,
    /// Relation name for relational cardinalities.
    pub relation: Option<String>,
    /// Descriptor field to storage column mapping.
    pub columns: ColumnMapping,
    /// Granted capabilities.
    pub capabilities: HashSet<Capability>,
    /// Roles allowed to see the slot; `None` means any authenticated role.
    pub visible_to: Option<Vec<String>>,
    /// Maximum declared upload size in bytes.
    pub max_file_size: Option<u64>,
    /// Allowed MIME types; empty allows any.
    pub allowed_mime_types: Vec<String>,
}

impl SlotConfig {
    /// Minimal single-cardinality slot with every capability granted.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            disk: "s3".to_string(),
            path_prefix: None,
            preserve_filename: false,
            cardinality: Cardinality::Single,
            relation: None,
            columns: ColumnMapping::standard(),
            capabilities: [
                Capability::View,
                Capability::Upload,
                Capability::Download,
                Capability::Delete,
            ]
            .into_iter()
            .collect(),
            visible_to: None,
            max_file_size: None,
            allowed_mime_types: Vec::new(),
        }
    }

    /// Set the key prefix.
    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        let trimmed = prefix.trim_matches('/');
        self.path_prefix = (!trimmed.is_empty()).then(|| trimmed.to_string());
        self
    }

    /// Keep original file names.
    #[must_use]
    pub fn preserving_filename(mut self) -> Self {
        self.preserve_filename = true;
        self
    }

    /// Set the cardinality, with the relation name for relational variants.
    #[must_use]
    pub fn with_cardinality(mut self, cardinality: Cardinality, relation: Option<&str>) -> Self {
        self.cardinality = cardinality;
        self.relation = relation.map(String::from);
        self
    }

    /// Replace the granted capabilities.
    #[must_use]
    pub fn with_capabilities(mut self, capabilities: &[Capability]) -> Self {
        self.capabilities = capabilities.iter().copied().collect();
        self
    }

    /// Whether the slot grants `capability`.
    #[must_use]
    pub fn grants(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }

    /// Whether a principal with `role` can see the slot.
    #[must_use]
    pub fn is_visible_to(&self, role: &str) -> bool {
        self.visible_to
            .as_ref()
            .is_none_or(|roles| roles.iter().any(|r| r == role))
    }

    /// Whether a MIME type may be uploaded into this slot.
    #[must_use]
    pub fn accepts_mime_type(&self, mime_type: &str) -> bool {
        self.allowed_mime_types.is_empty() || self.allowed_mime_types.iter().any(|t| t == mime_type)
    }

    /// Relation name, falling back to the slot name.
    #[must_use]
    pub fn relation_name(&self) -> &str {
        self.relation.as_deref().unwrap_or(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capability_roundtrip() {
        for cap in [
            Capability::View,
            Capability::Upload,
            Capability::Download,
            Capability::Delete,
        ] {
            assert_eq!(Capability::parse(cap.as_str()), Some(cap));
        }
        assert_eq!(Capability::parse("admin"), None);
    }

    #[test]
    fn test_cardinality_parse() {
        assert_eq!(Cardinality::parse("multiple"), Some(Cardinality::Multiple));
        assert!(Cardinality::parse("relational_many").unwrap().is_relational());
        assert!(!Cardinality::Single.is_relational());
        assert_eq!(Cardinality::parse("isArray"), None);
    }

    #[test]
    fn test_visibility_defaults_to_everyone() {
        let mut slot = SlotConfig::new("scan");
        assert!(slot.is_visible_to("anyone"));

        slot.visible_to = Some(vec!["editor".to_string()]);
        assert!(slot.is_visible_to("editor"));
        assert!(!slot.is_visible_to("viewer"));
    }

    #[test]
    fn test_prefix_is_trimmed() {
        assert_eq!(
            SlotConfig::new("scan").with_prefix("/docs/").path_prefix.as_deref(),
            Some("docs")
        );
        assert_eq!(SlotConfig::new("scan").with_prefix("/").path_prefix, None);
    }

    #[test]
    fn test_standard_mapping() {
        let mapping = ColumnMapping::standard();
        assert_eq!(mapping.file_key_column(), "file_key");
        assert_eq!(mapping.column(FILE_TYPE), Some("file_type"));
        assert_eq!(mapping.column("checksum"), None);
    }

    #[test]
    fn test_mime_restrictions() {
        let mut slot = SlotConfig::new("scan");
        assert!(slot.accepts_mime_type("application/x-anything"));
        slot.allowed_mime_types = vec!["application/pdf".to_string()];
        assert!(slot.accepts_mime_type("application/pdf"));
        assert!(!slot.accepts_mime_type("image/png"));
    }
}
