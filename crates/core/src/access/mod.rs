//! Attachment slot catalog and per-slot access checks.

mod catalog;
mod guard;
mod types;

pub use catalog::{CatalogError, ResourceCatalog};
pub use guard::{AccessError, AccessGuard, Principal};
pub use types::{
    Capability, Cardinality, ColumnMapping, FILE_KEY, FILE_NAME, FILE_SIZE, FILE_TYPE, SlotConfig,
};
