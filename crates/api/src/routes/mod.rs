//! API route definitions.
//!
//! Field-scoped routes live under
//! `/resources/{resource}/{record_id}/fields/{field}`.

use axum::{Router, middleware};
use serde::Deserialize;
use upvault_core::registry::OwnerRef;
use upvault_shared::types::RecordId;

use crate::{AppState, middleware::auth_middleware};

pub mod files;
pub mod health;
pub mod multipart;

/// Route prefix identifying one attachment field of one record.
pub const FIELD_PREFIX: &str = "/resources/{resource}/{record_id}/fields/{field}";

/// Path parameters shared by every field-scoped route.
#[derive(Debug, Deserialize)]
pub struct FieldPath {
    /// Resource type.
    pub resource: String,
    /// Owning record.
    pub record_id: RecordId,
    /// Attachment slot name.
    pub field: String,
}

impl FieldPath {
    /// The owning record.
    #[must_use]
    pub fn owner(&self) -> OwnerRef {
        OwnerRef::new(self.resource.clone(), self.record_id)
    }
}

/// Creates the API router with protected routes that need state for middleware.
#[allow(clippy::needless_pass_by_value)]
pub fn api_routes_with_state(state: AppState) -> Router<AppState> {
    // Preflight OPTIONS requests pass through the middleware unauthenticated.
    let protected_routes = Router::new()
        .merge(multipart::routes())
        .merge(files::routes())
        .layer(middleware::from_fn_with_state(state, auth_middleware));

    Router::new()
        .merge(health::routes())
        .merge(protected_routes)
}
