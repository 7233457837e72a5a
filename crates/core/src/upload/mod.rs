//! Multipart upload session coordination.
//!
//! Derives object keys, validates client input against the slot, and drives
//! the signer's five primitives. No session state is kept here; the storage
//! backend owns it.

mod error;
mod key;
mod service;
mod types;

#[cfg(test)]
mod props;

pub use error::UploadError;
pub use key::{
    MAX_PART_NUMBER, base_name, generate_object_key, parse_part_numbers, sort_completed_parts,
    validate_key,
};
pub use service::UploadCoordinator;
pub use types::{CompleteInput, CreateSessionInput, DEFAULT_CONTENT_TYPE, SignedPart, SignedPartBatch};
