//! Upvault API Server
//!
//! Main entry point for the upload coordination service.

use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use upvault_api::{AppState, create_router};
use upvault_core::access::{AccessGuard, ResourceCatalog};
use upvault_core::registry::FileRegistry;
use upvault_core::storage::{S3Signer, StorageConfig, StorageService};
use upvault_core::upload::UploadCoordinator;
use upvault_db::{RecordRepository, connect_with};
use upvault_shared::{AppConfig, JwtConfig, JwtService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "upvault=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::load().context("failed to load configuration")?;

    let db = connect_with(&config.database).await?;
    info!("Connected to database");

    // Storage backends
    let storage_config = StorageConfig::from_settings(&config.storage);
    let disk = storage_config.provider.name();
    let signer = S3Signer::connect(&storage_config).await?;
    let storage = StorageService::from_config(storage_config)?;
    info!(
        provider = storage.provider_name(),
        bucket = %config.storage.bucket,
        "Storage configured"
    );

    // Attachment slots
    let catalog = ResourceCatalog::from_settings(&config.resources)
        .and_then(|catalog| catalog.require_disk(disk).map(|()| catalog))
        .context("invalid resource configuration")?;
    info!(
        resources = config.resources.len(),
        slots = catalog.slot_count(),
        "Resource catalog loaded"
    );

    let jwt_config = JwtConfig {
        secret: config.jwt.secret.clone(),
        #[allow(clippy::cast_possible_wrap)]
        access_token_expires_minutes: (config.jwt.access_token_expiry_secs / 60) as i64,
    };

    let state = AppState {
        jwt_service: Arc::new(JwtService::new(jwt_config)),
        guard: AccessGuard::new(Arc::new(catalog)),
        coordinator: UploadCoordinator::new(Arc::new(signer)),
        registry: FileRegistry::new(
            Arc::new(RecordRepository::new(db)),
            Arc::new(storage),
            config.server.public_url.clone(),
        ),
        cors: Arc::new(config.cors.clone()),
    };

    let app = create_router(state);

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
