//! Core upload logic for Upvault.
//!
//! This crate contains the domain logic with ZERO web or database dependencies.
//! Storage and persistence are reached through traits implemented elsewhere.
//!
//! # Modules
//!
//! - `access` - Attachment slot catalog and per-slot capability checks
//! - `storage` - Object store and multipart signer seams, S3/OpenDAL backed
//! - `upload` - Multipart session coordination and object key derivation
//! - `registry` - File descriptors attached to owning records

pub mod access;
pub mod registry;
pub mod storage;
pub mod upload;

#[cfg(any(test, feature = "testing"))]
pub mod testing;
