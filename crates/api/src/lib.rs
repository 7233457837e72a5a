//! HTTP API layer with Axum routes and middleware.
//!
//! This crate provides:
//! - Multipart upload and file routes scoped to an attachment field
//! - Authentication middleware
//! - Error responses and extractors that produce them

pub mod error;
pub mod extract;
pub mod middleware;
pub mod routes;

#[cfg(test)]
mod test_support;

use std::sync::Arc;

use axum::Router;
use axum::extract::Request;
use axum::http::{HeaderName, HeaderValue, Method, StatusCode, header};
use axum::middleware::{Next, from_fn};
use axum::response::Response;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use upvault_core::access::{AccessGuard, Capability, Principal, SlotConfig};
use upvault_core::registry::FileRegistry;
use upvault_core::upload::UploadCoordinator;
use upvault_shared::{CorsConfig, JwtService};

use crate::error::ApiError;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// JWT service for token validation.
    pub jwt_service: Arc<JwtService>,
    /// Slot resolution and capability checks.
    pub guard: AccessGuard,
    /// Multipart session coordinator.
    pub coordinator: UploadCoordinator,
    /// Descriptor registry.
    pub registry: FileRegistry,
    /// Cross-origin settings.
    pub cors: Arc<CorsConfig>,
}

impl AppState {
    /// Resolve a slot and require `capability` for the principal.
    ///
    /// # Errors
    ///
    /// 404 for unknown resources or fields, 403 for denied capabilities.
    pub fn authorize(
        &self,
        principal: &Principal,
        resource: &str,
        field: &str,
        capability: Capability,
    ) -> Result<&SlotConfig, ApiError> {
        Ok(self
            .guard
            .authorize(principal, resource, field, capability)?)
    }
}

/// Headers browsers may send cross-origin: the framework auth header plus the
/// ones every request here uses.
#[must_use]
pub fn allowed_headers(cors: &CorsConfig) -> Vec<HeaderName> {
    let mut headers = vec![header::AUTHORIZATION, header::CONTENT_TYPE];
    if let Ok(name) = HeaderName::try_from(cors.auth_header.as_str()) {
        headers.push(name);
    }
    headers
}

fn cors_layer(cors: &CorsConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = cors
        .allowed_origins
        .iter()
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect();
    let allow_origin = if origins.is_empty() {
        AllowOrigin::from(Any)
    } else {
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers(allowed_headers(cors))
}

/// Preflights are answered by the CORS layer with 200; report them as 204.
async fn preflight_no_content(request: Request, next: Next) -> Response {
    let preflight = request.method() == Method::OPTIONS;
    let mut response = next.run(request).await;
    if preflight && response.status() == StatusCode::OK {
        *response.status_mut() = StatusCode::NO_CONTENT;
    }
    response
}

/// Creates the main application router.
pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state.cors);
    Router::new()
        .nest("/api/v1", routes::api_routes_with_state(state.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(from_fn(preflight_no_content))
        .with_state(state)
}
