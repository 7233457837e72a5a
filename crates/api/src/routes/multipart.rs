//! Multipart upload routes.
//!
//! Every route needs the `Upload` capability on the field. The client keeps
//! the object key and passes it back as `?key=` on each follow-up call.
//! Browser preflights are answered by the CORS layer in the root router.

use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::{Value, json};
use upvault_core::access::Capability;
use upvault_core::storage::{CompletedUpload, UploadSession, UploadedPart};
use upvault_core::upload::{CompleteInput, CreateSessionInput, SignedPart, SignedPartBatch};
use upvault_shared::types::RecordId;

use super::{FIELD_PREFIX, FieldPath};
use crate::{
    AppState,
    error::ApiError,
    extract::{ApiJson, ApiPath, ApiQuery},
    middleware::AuthUser,
};

/// Creates the multipart routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            &format!("{FIELD_PREFIX}/s3/multipart"),
            post(create_upload),
        )
        .route(
            &format!("{FIELD_PREFIX}/s3/multipart/{{upload_id}}"),
            get(list_parts).delete(abort_upload),
        )
        .route(
            &format!("{FIELD_PREFIX}/s3/multipart/{{upload_id}}/batch"),
            get(sign_part_batch),
        )
        .route(
            &format!("{FIELD_PREFIX}/s3/multipart/{{upload_id}}/complete"),
            post(complete_upload),
        )
        .route(
            &format!("{FIELD_PREFIX}/s3/multipart/{{upload_id}}/{{part_number}}"),
            get(sign_part),
        )
}

// ============================================================================
// Request Types
// ============================================================================

/// Path of a route addressing one upload.
#[derive(Debug, Deserialize)]
pub struct UploadPath {
    /// Resource type.
    pub resource: String,
    /// Owning record.
    pub record_id: RecordId,
    /// Attachment slot name.
    pub field: String,
    /// Backend upload ID.
    pub upload_id: String,
}

/// Path of a route addressing one part.
#[derive(Debug, Deserialize)]
pub struct PartPath {
    /// Resource type.
    pub resource: String,
    /// Owning record.
    pub record_id: RecordId,
    /// Attachment slot name.
    pub field: String,
    /// Backend upload ID.
    pub upload_id: String,
    /// 1-based part number.
    pub part_number: u32,
}

/// `?key=` query.
#[derive(Debug, Deserialize)]
pub struct KeyQuery {
    /// Object key returned when the session was created.
    #[serde(default)]
    pub key: String,
}

/// `?key=&partNumbers=1,2,3` query.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchQuery {
    /// Object key returned when the session was created.
    #[serde(default)]
    pub key: String,
    /// Comma-separated part numbers.
    #[serde(default)]
    pub part_numbers: String,
}

// ============================================================================
// Route Handlers
// ============================================================================

/// POST `{field}/s3/multipart`
async fn create_upload(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(path): ApiPath<FieldPath>,
    ApiJson(input): ApiJson<CreateSessionInput>,
) -> Result<Json<UploadSession>, ApiError> {
    let slot = state.authorize(&auth.principal(), &path.resource, &path.field, Capability::Upload)?;
    let session = state.coordinator.create_session(slot, &input).await?;
    Ok(Json(session))
}

/// GET `{field}/s3/multipart/{upload_id}/{part_number}?key=`
async fn sign_part(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(path): ApiPath<PartPath>,
    ApiQuery(query): ApiQuery<KeyQuery>,
) -> Result<Json<SignedPart>, ApiError> {
    let slot = state.authorize(&auth.principal(), &path.resource, &path.field, Capability::Upload)?;
    let url = state
        .coordinator
        .sign_part(slot, &query.key, &path.upload_id, path.part_number)
        .await?;
    Ok(Json(SignedPart { url }))
}

/// GET `{field}/s3/multipart/{upload_id}/batch?key=&partNumbers=`
async fn sign_part_batch(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(path): ApiPath<UploadPath>,
    ApiQuery(query): ApiQuery<BatchQuery>,
) -> Result<Json<SignedPartBatch>, ApiError> {
    let slot = state.authorize(&auth.principal(), &path.resource, &path.field, Capability::Upload)?;
    let batch = state
        .coordinator
        .sign_parts_batch(slot, &query.key, &path.upload_id, &query.part_numbers)
        .await?;
    Ok(Json(batch))
}

/// GET `{field}/s3/multipart/{upload_id}?key=`
async fn list_parts(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(path): ApiPath<UploadPath>,
    ApiQuery(query): ApiQuery<KeyQuery>,
) -> Result<Json<Vec<UploadedPart>>, ApiError> {
    let slot = state.authorize(&auth.principal(), &path.resource, &path.field, Capability::Upload)?;
    let parts = state
        .coordinator
        .list_parts(slot, &query.key, &path.upload_id)
        .await?;
    Ok(Json(parts))
}

/// POST `{field}/s3/multipart/{upload_id}/complete?key=`
async fn complete_upload(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(path): ApiPath<UploadPath>,
    ApiQuery(query): ApiQuery<KeyQuery>,
    ApiJson(input): ApiJson<CompleteInput>,
) -> Result<Json<CompletedUpload>, ApiError> {
    let slot = state.authorize(&auth.principal(), &path.resource, &path.field, Capability::Upload)?;
    let completed = state
        .coordinator
        .complete(slot, &query.key, &path.upload_id, input.parts)
        .await?;
    Ok(Json(completed))
}

/// DELETE `{field}/s3/multipart/{upload_id}?key=`
async fn abort_upload(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(path): ApiPath<UploadPath>,
    ApiQuery(query): ApiQuery<KeyQuery>,
) -> Result<Json<Value>, ApiError> {
    let slot = state.authorize(&auth.principal(), &path.resource, &path.field, Capability::Upload)?;
    state
        .coordinator
        .abort(slot, &query.key, &path.upload_id)
        .await?;
    Ok(Json(json!({})))
}
