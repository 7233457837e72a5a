//! File registry.
//!
//! Attaches finished objects to an owning record's slot and serves them back:
//! - listing descriptors (with retrieval URLs for relational slots)
//! - storing a descriptor according to the slot's cardinality
//! - presigned downloads, checked against both registry and storage
//! - destroying object and descriptor, in that order

mod error;
mod service;
mod store;
mod types;

pub use error::RegistryError;
pub use service::FileRegistry;
pub use store::{DescriptorStore, FieldUpdate};
pub use types::{FileDescriptor, ListedFile, OwnerRef};
