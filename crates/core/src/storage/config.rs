//! Storage configuration types.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use upvault_shared::StorageSettings;

/// Storage provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StorageProvider {
    /// S3-compatible storage: AWS S3, Cloudflare R2, MinIO, DigitalOcean Spaces
    S3 {
        /// S3 endpoint URL. Empty selects the AWS default for the region.
        endpoint: String,
        /// S3 bucket name.
        bucket: String,
        /// Access key ID. `None` defers to the ambient credential chain.
        access_key_id: Option<String>,
        /// Secret access key.
        secret_access_key: Option<String>,
        /// Region.
        region: String,
    },
    /// Local filesystem (development only, no multipart signing)
    LocalFs {
        /// Root directory path.
        root: PathBuf,
    },
}

impl StorageProvider {
    /// Create S3-compatible provider with static credentials.
    #[must_use]
    pub fn s3(
        endpoint: impl Into<String>,
        bucket: impl Into<String>,
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        region: impl Into<String>,
    ) -> Self {
        Self::S3 {
            endpoint: endpoint.into(),
            bucket: bucket.into(),
            access_key_id: Some(access_key_id.into()),
            secret_access_key: Some(secret_access_key.into()),
            region: region.into(),
        }
    }

    /// Create local filesystem provider (development only).
    #[must_use]
    pub fn local_fs(root: impl Into<PathBuf>) -> Self {
        Self::LocalFs { root: root.into() }
    }

    /// Get the provider name (the slot "disk" identifier).
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::S3 { .. } => "s3",
            Self::LocalFs { .. } => "local",
        }
    }

    /// Get the bucket name.
    #[must_use]
    pub fn bucket(&self) -> &str {
        match self {
            Self::S3 { bucket, .. } => bucket,
            Self::LocalFs { root } => root.to_str().unwrap_or("local"),
        }
    }
}

/// Storage service configuration.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Storage provider configuration.
    pub provider: StorageProvider,
    /// Presigned part-upload URL TTL in seconds (default: 1200 = 20 minutes).
    pub part_url_ttl_secs: u64,
    /// Presigned download URL TTL in seconds (default: 300 = 5 minutes).
    pub download_url_ttl_secs: u64,
}

impl StorageConfig {
    /// Default part-upload TTL: 20 minutes.
    pub const DEFAULT_PART_URL_TTL: u64 = 1200;
    /// Default download TTL: 5 minutes.
    pub const DEFAULT_DOWNLOAD_TTL: u64 = 300;

    /// Create a new storage config with default settings.
    #[must_use]
    pub fn new(provider: StorageProvider) -> Self {
        Self {
            provider,
            part_url_ttl_secs: Self::DEFAULT_PART_URL_TTL,
            download_url_ttl_secs: Self::DEFAULT_DOWNLOAD_TTL,
        }
    }

    /// Build an S3 storage config from loaded application settings.
    #[must_use]
    pub fn from_settings(settings: &StorageSettings) -> Self {
        Self {
            provider: StorageProvider::S3 {
                endpoint: settings.endpoint.clone(),
                bucket: settings.bucket.clone(),
                access_key_id: settings.access_key_id.clone(),
                secret_access_key: settings.secret_access_key.clone(),
                region: settings.region.clone(),
            },
            part_url_ttl_secs: settings.part_url_ttl_secs,
            download_url_ttl_secs: settings.download_url_ttl_secs,
        }
    }

    /// Set presigned part-upload URL TTL.
    #[must_use]
    pub fn with_part_url_ttl(mut self, secs: u64) -> Self {
        self.part_url_ttl_secs = secs;
        self
    }

    /// Set presigned download URL TTL.
    #[must_use]
    pub fn with_download_ttl(mut self, secs: u64) -> Self {
        self.download_url_ttl_secs = secs;
        self
    }
}
