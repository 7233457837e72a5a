//! Resource catalog: validated slot configuration, built once at startup.

use std::collections::{HashMap, HashSet};

use thiserror::Error;
use upvault_shared::{ResourceSettings, SlotSettings};

use super::types::{Capability, Cardinality, ColumnMapping, FILE_KEY, SlotConfig};

/// Slot configuration errors, reported at load time.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CatalogError {
    /// Resource or slot with an empty name.
    #[error("resource and slot names must not be empty")]
    EmptyName,

    /// Resource declared twice.
    #[error("resource '{0}' is declared more than once")]
    DuplicateResource(String),

    /// Slot declared twice on one resource.
    #[error("slot '{resource}.{slot}' is declared more than once")]
    DuplicateSlot {
        /// Resource name.
        resource: String,
        /// Slot name.
        slot: String,
    },

    /// Unrecognised cardinality string.
    #[error("slot '{slot}': unknown cardinality '{value}'")]
    UnknownCardinality {
        /// Slot name.
        slot: String,
        /// Offending value.
        value: String,
    },

    /// Unrecognised capability string.
    #[error("slot '{slot}': unknown capability '{value}'")]
    UnknownCapability {
        /// Slot name.
        slot: String,
        /// Offending value.
        value: String,
    },

    /// Relational slot without a relation name.
    #[error("slot '{0}': relational cardinality requires a relation")]
    MissingRelation(String),

    /// Column mapping without a `file_key` entry.
    #[error("slot '{0}': column mapping must map file_key")]
    MissingFileKeyColumn(String),

    /// Logical field or column mapped twice, or mapped to an empty name.
    #[error("slot '{slot}': column mapping entry '{name}' is empty or duplicated")]
    InvalidColumn {
        /// Slot name.
        slot: String,
        /// Offending logical field or column.
        name: String,
    },

    /// Slot bound to a disk this deployment does not serve.
    #[error("slot '{slot}': disk '{disk}' is not configured")]
    UnknownDisk {
        /// Slot name.
        slot: String,
        /// Requested disk.
        disk: String,
    },
}

/// All resources and their attachment slots.
#[derive(Debug, Clone, Default)]
pub struct ResourceCatalog {
    resources: HashMap<String, HashMap<String, SlotConfig>>,
}

impl ResourceCatalog {
    /// Validate raw settings into a catalog.
    ///
    /// # Errors
    ///
    /// Returns the first configuration problem found.
    pub fn from_settings(settings: &[ResourceSettings]) -> Result<Self, CatalogError> {
        let mut catalog = Self::default();
        for resource in settings {
            if resource.name.is_empty() {
                return Err(CatalogError::EmptyName);
            }
            if catalog.resources.contains_key(&resource.name) {
                return Err(CatalogError::DuplicateResource(resource.name.clone()));
            }

            let mut slots = HashMap::new();
            for raw in &resource.slots {
                let slot = build_slot(raw)?;
                if slots.contains_key(&slot.name) {
                    return Err(CatalogError::DuplicateSlot {
                        resource: resource.name.clone(),
                        slot: slot.name,
                    });
                }
                slots.insert(slot.name.clone(), slot);
            }
            catalog.resources.insert(resource.name.clone(), slots);
        }
        Ok(catalog)
    }

    /// Register an already-built slot. Replaces a slot of the same name.
    #[must_use]
    pub fn with_slot(mut self, resource: &str, slot: SlotConfig) -> Self {
        self.resources
            .entry(resource.to_string())
            .or_default()
            .insert(slot.name.clone(), slot);
        self
    }

    /// Whether the resource type is known.
    #[must_use]
    pub fn has_resource(&self, resource: &str) -> bool {
        self.resources.contains_key(resource)
    }

    /// Look up a slot.
    #[must_use]
    pub fn slot(&self, resource: &str, slot: &str) -> Option<&SlotConfig> {
        self.resources.get(resource)?.get(slot)
    }

    /// Check that every slot targets `disk`, the one storage backend in use.
    ///
    /// # Errors
    ///
    /// Returns the first slot bound to any other disk.
    pub fn require_disk(&self, disk: &str) -> Result<(), CatalogError> {
        match self.resources.values().flat_map(HashMap::values).find(|slot| slot.disk != disk) {
            Some(slot) => Err(CatalogError::UnknownDisk {
                slot: slot.name.clone(),
                disk: slot.disk.clone(),
            }),
            None => Ok(()),
        }
    }

    /// Number of configured slots across all resources.
    #[must_use]
    pub fn slot_count(&self) -> usize {
        self.resources.values().map(HashMap::len).sum()
    }
}

fn build_slot(raw: &SlotSettings) -> Result<SlotConfig, CatalogError> {
    if raw.name.is_empty() {
        return Err(CatalogError::EmptyName);
    }

    let cardinality =
        Cardinality::parse(&raw.cardinality).ok_or_else(|| CatalogError::UnknownCardinality {
            slot: raw.name.clone(),
            value: raw.cardinality.clone(),
        })?;
    let relation = raw.relation.clone().filter(|r| !r.is_empty());
    if cardinality.is_relational() && relation.is_none() {
        return Err(CatalogError::MissingRelation(raw.name.clone()));
    }

    let capabilities = raw
        .capabilities
        .iter()
        .map(|c| {
            Capability::parse(c).ok_or_else(|| CatalogError::UnknownCapability {
                slot: raw.name.clone(),
                value: c.clone(),
            })
        })
        .collect::<Result<HashSet<_>, _>>()?;

    let mut slot = SlotConfig::new(&raw.name);
    slot.disk.clone_from(&raw.disk);
    slot.preserve_filename = raw.preserve_filename;
    slot.cardinality = cardinality;
    slot.relation = relation;
    slot.columns = build_columns(&raw.name, &raw.columns)?;
    slot.capabilities = capabilities;
    slot.visible_to.clone_from(&raw.visible_to);
    slot.max_file_size = raw.max_file_size;
    slot.allowed_mime_types.clone_from(&raw.allowed_mime_types);
    if let Some(prefix) = &raw.path_prefix {
        slot = slot.with_prefix(prefix.as_str());
    }
    Ok(slot)
}

fn build_columns(slot: &str, raw: &[(String, String)]) -> Result<ColumnMapping, CatalogError> {
    if raw.is_empty() {
        return Ok(ColumnMapping::standard());
    }

    let mut logical_seen = HashSet::new();
    let mut columns_seen = HashSet::new();
    for (logical, column) in raw {
        for (name, seen) in [(logical, &mut logical_seen), (column, &mut columns_seen)] {
            if name.is_empty() || !seen.insert(name.as_str()) {
                return Err(CatalogError::InvalidColumn {
                    slot: slot.to_string(),
                    name: name.clone(),
                });
            }
        }
    }
    if !logical_seen.contains(FILE_KEY) {
        return Err(CatalogError::MissingFileKeyColumn(slot.to_string()));
    }

    Ok(ColumnMapping::new_unchecked(raw.to_vec()))
}
