//! Shared types, errors, and configuration for Upvault.
//!
//! This crate provides common types used across all other crates:
//! - Typed IDs for owning records
//! - Application-wide error types
//! - Configuration management
//! - JWT claims and token validation for the calling principal

pub mod auth;
pub mod config;
pub mod error;
pub mod jwt;
pub mod types;

pub use auth::Claims;
pub use config::{
    AppConfig, CorsConfig, DatabaseConfig, JwtSettings, ResourceSettings, ServerConfig,
    SlotSettings, StorageSettings,
};
pub use error::{AppError, AppResult};
pub use jwt::{JwtConfig, JwtError, JwtService};
