//! Application configuration management.
//!
//! Everything here is raw, deserialized settings. Attachment slot settings are
//! validated into a typed catalog by `upvault-core` once at startup.

use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// JWT configuration.
    pub jwt: JwtSettings,
    /// Object storage configuration.
    pub storage: StorageSettings,
    /// Cross-origin settings.
    #[serde(default)]
    pub cors: CorsConfig,
    /// Resources and their attachment slots.
    #[serde(default)]
    pub resources: Vec<ResourceSettings>,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Externally visible base URL, used to build descriptor retrieval URLs.
    #[serde(default = "default_public_url")]
    pub public_url: String,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_public_url() -> String {
    "http://localhost:8080".to_string()
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

/// JWT configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct JwtSettings {
    /// Secret key for verifying tokens.
    pub secret: String,
    /// Access token expiration in seconds (for locally issued tokens).
    #[serde(default = "default_access_token_expiry")]
    pub access_token_expiry_secs: u64,
}

fn default_access_token_expiry() -> u64 {
    900 // 15 minutes
}

/// Object storage configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageSettings {
    /// S3 endpoint URL. Empty means the AWS default for the region.
    #[serde(default)]
    pub endpoint: String,
    /// Bucket name.
    pub bucket: String,
    /// Region.
    #[serde(default = "default_region")]
    pub region: String,
    /// Access key ID. Falls back to the ambient AWS credential chain when absent.
    pub access_key_id: Option<String>,
    /// Secret access key.
    pub secret_access_key: Option<String>,
    /// Validity of a presigned part-upload URL, in seconds.
    #[serde(default = "default_part_url_ttl")]
    pub part_url_ttl_secs: u64,
    /// Validity of a presigned download URL, in seconds.
    #[serde(default = "default_download_url_ttl")]
    pub download_url_ttl_secs: u64,
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_part_url_ttl() -> u64 {
    1200 // 20 minutes
}

fn default_download_url_ttl() -> u64 {
    300 // 5 minutes
}

/// Cross-origin settings.
#[derive(Debug, Clone, Deserialize)]
pub struct CorsConfig {
    /// Allowed origins. Empty allows any origin.
    #[serde(default)]
    pub allowed_origins: Vec<String>,
    /// Framework auth header browsers must be allowed to send cross-origin.
    #[serde(default = "default_auth_header")]
    pub auth_header: String,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: Vec::new(),
            auth_header: default_auth_header(),
        }
    }
}

fn default_auth_header() -> String {
    "X-CSRF-TOKEN".to_string()
}

/// A resource type and its attachment slots.
#[derive(Debug, Clone, Deserialize)]
pub struct ResourceSettings {
    /// Resource type name as it appears in routes.
    pub name: String,
    /// Attachment slots on this resource.
    #[serde(default)]
    pub slots: Vec<SlotSettings>,
}

/// Raw attachment slot settings.
#[derive(Debug, Clone, Deserialize)]
pub struct SlotSettings {
    /// Slot (field) name as it appears in routes.
    pub name: String,
    /// Storage backend identifier.
    #[serde(default = "default_disk")]
    pub disk: String,
    /// Path prefix prepended to generated object keys.
    #[serde(default)]
    pub path_prefix: Option<String>,
    /// Keep the client's original file name instead of an opaque one.
    #[serde(default)]
    pub preserve_filename: bool,
    /// `single`, `multiple`, `relational_one`, or `relational_many`.
    #[serde(default = "default_cardinality")]
    pub cardinality: String,
    /// Related table/relation name for relational cardinalities.
    #[serde(default)]
    pub relation: Option<String>,
    /// Ordered `[logical_field, storage_column]` pairs.
    #[serde(default)]
    pub columns: Vec<(String, String)>,
    /// Granted capabilities: `view`, `upload`, `download`, `delete`.
    #[serde(default)]
    pub capabilities: Vec<String>,
    /// Roles allowed to see the slot. Absent means every authenticated role.
    #[serde(default)]
    pub visible_to: Option<Vec<String>>,
    /// Maximum declared file size in bytes.
    #[serde(default)]
    pub max_file_size: Option<u64>,
    /// Allowed MIME types. Empty allows any.
    #[serde(default)]
    pub allowed_mime_types: Vec<String>,
}

fn default_disk() -> String {
    "s3".to_string()
}

fn default_cardinality() -> String {
    "single".to_string()
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("UPVAULT").separator("__"))
            .build()?;

        config.try_deserialize()
    }

    /// Parses configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is not valid configuration.
    pub fn from_toml(toml: &str) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::File::from_str(toml, config::FileFormat::Toml))
            .build()?
            .try_deserialize()
    }
}
