//! File descriptor routes.

use axum::{
    Json, Router,
    extract::State,
    routing::get,
};
use serde::{Deserialize, Serialize};
use upvault_core::access::Capability;
use upvault_core::registry::{FileDescriptor, ListedFile, OwnerRef};
use upvault_shared::types::RecordId;

use super::{FIELD_PREFIX, FieldPath};
use crate::{
    AppState,
    error::ApiError,
    extract::{ApiJson, ApiPath},
    middleware::AuthUser,
};

/// Creates the file routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            &format!("{FIELD_PREFIX}/files"),
            get(list_files).post(store_file),
        )
        .route(
            &format!("{FIELD_PREFIX}/files/{{*file_key}}"),
            get(download_file).delete(destroy_file),
        )
}

/// Path of a route addressing one stored file. Keys may contain slashes.
#[derive(Debug, Deserialize)]
pub struct FileKeyPath {
    /// Resource type.
    pub resource: String,
    /// Owning record.
    pub record_id: RecordId,
    /// Attachment slot name.
    pub field: String,
    /// Object key.
    pub file_key: String,
}

impl FileKeyPath {
    fn owner(&self) -> OwnerRef {
        OwnerRef::new(self.resource.clone(), self.record_id)
    }
}

/// Files attached to a field.
#[derive(Debug, Serialize)]
pub struct FileListResponse {
    /// Attached descriptors.
    pub files: Vec<ListedFile>,
}

/// Human-readable confirmation.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    /// Message text.
    pub message: String,
}

/// Short-lived download link.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadResponse {
    /// Presigned GET URL.
    pub temporary_url: String,
}

/// GET `{field}/files`
async fn list_files(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(path): ApiPath<FieldPath>,
) -> Result<Json<FileListResponse>, ApiError> {
    let slot = state.authorize(&auth.principal(), &path.resource, &path.field, Capability::View)?;
    let files = state.registry.list(&path.owner(), slot).await?;
    Ok(Json(FileListResponse { files }))
}

/// POST `{field}/files`
async fn store_file(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(path): ApiPath<FieldPath>,
    ApiJson(descriptor): ApiJson<FileDescriptor>,
) -> Result<Json<MessageResponse>, ApiError> {
    let slot = state.authorize(&auth.principal(), &path.resource, &path.field, Capability::Upload)?;
    state.registry.store(&path.owner(), slot, descriptor).await?;
    Ok(Json(MessageResponse {
        message: "File stored".to_string(),
    }))
}

/// GET `{field}/files/{*file_key}`
async fn download_file(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(path): ApiPath<FileKeyPath>,
) -> Result<Json<DownloadResponse>, ApiError> {
    let slot = state.authorize(
        &auth.principal(),
        &path.resource,
        &path.field,
        Capability::Download,
    )?;
    let presigned = state
        .registry
        .download(&path.owner(), slot, &path.file_key)
        .await?;
    Ok(Json(DownloadResponse {
        temporary_url: presigned.url,
    }))
}

/// DELETE `{field}/files/{*file_key}`
async fn destroy_file(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(path): ApiPath<FileKeyPath>,
) -> Result<Json<MessageResponse>, ApiError> {
    let slot = state.authorize(&auth.principal(), &path.resource, &path.field, Capability::Delete)?;
    state
        .registry
        .destroy(&path.owner(), slot, &path.file_key)
        .await?;
    Ok(Json(MessageResponse {
        message: "File deleted".to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    use crate::test_support::TestApp;

    fn keys(files: &serde_json::Value) -> Vec<String> {
        files["files"]
            .as_array()
            .unwrap()
            .iter()
            .map(|f| f["fileKey"].as_str().unwrap().to_string())
            .collect()
    }

    #[tokio::test]
    async fn test_list_drops_unattached_entries() {
        let app = TestApp::new();
        app.store.set_field(
            &app.owner,
            "attachments",
            json!([
                {"file_key": "docs/a.pdf", "file_name": "a.pdf"},
                {"file_key": ""},
                {"file_key": "docs/b.pdf"}
            ]),
        );

        let (status, body) = app
            .call(Method::GET, &app.field_uri("attachments", "/files"), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(keys(&body), vec!["docs/a.pdf", "docs/b.pdf"]);
        assert_eq!(body["files"][0]["fileName"], "a.pdf");
    }

    #[tokio::test]
    async fn test_relational_listing_includes_url() {
        let app = TestApp::new();
        let uri = app.field_uri("photos", "/files");

        let (status, _) = app
            .call(Method::POST, &uri, Some(json!({"fileKey": "photos/p.png", "fileSize": 10})))
            .await;
        assert_eq!(status, StatusCode::OK);

        let (_, body) = app.call(Method::GET, &uri, None).await;
        let url = body["files"][0]["url"].as_str().unwrap();
        assert!(url.starts_with("https://api.test/api/v1/resources/posts/"));
        assert!(url.ends_with("/fields/photos/files/photos/p.png"));
    }

    #[tokio::test]
    async fn test_listed_url_with_reserved_characters_resolves() {
        let app = TestApp::new();
        let uri = app.field_uri("photos", "/files");
        app.objects.put("photos/a b#1?.png");

        app.call(Method::POST, &uri, Some(json!({"fileKey": "photos/a b#1?.png"})))
            .await;

        let (_, body) = app.call(Method::GET, &uri, None).await;
        let url = body["files"][0]["url"].as_str().unwrap();
        assert!(url.ends_with("/files/photos/a%20b%231%3F.png"), "{url}");

        let path = url.strip_prefix("https://api.test").unwrap();
        let (status, body) = app.call(Method::GET, path, None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["temporaryUrl"].is_string());
    }

    #[tokio::test]
    async fn test_malformed_store_body_gets_validation_body() {
        let app = TestApp::new();
        let (status, body) = app
            .call(
                Method::POST,
                &app.field_uri("cover", "/files"),
                Some(json!({"fileKey": 5})),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_malformed_record_id_gets_validation_body() {
        let app = TestApp::new();
        let (status, body) = app
            .call(Method::GET, "/api/v1/resources/posts/not-a-uuid/fields/cover/files", None)
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_single_store_deletes_previous_object_once() {
        let app = TestApp::new();
        let uri = app.field_uri("cover", "/files");
        app.objects.put("covers/old.png");
        app.objects.put("covers/new.png");

        app.call(Method::POST, &uri, Some(json!({"fileKey": "covers/old.png"})))
            .await;
        assert!(app.objects.deleted().is_empty());

        let (status, body) = app
            .call(Method::POST, &uri, Some(json!({"fileKey": "covers/new.png"})))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "File stored");
        assert_eq!(app.objects.deleted(), vec!["covers/old.png".to_string()]);
        assert_eq!(
            app.store.field(&app.owner, "cover").unwrap()["file_key"],
            "covers/new.png"
        );
    }

    #[tokio::test]
    async fn test_store_without_key_is_rejected() {
        let app = TestApp::new();
        let (status, body) = app
            .call(
                Method::POST,
                &app.field_uri("cover", "/files"),
                Some(json!({"fileName": "x.png"})),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_download_returns_temporary_url() {
        let app = TestApp::new();
        app.objects.put("docs/a.pdf");
        app.store.set_field(
            &app.owner,
            "attachments",
            json!([{"file_key": "docs/a.pdf", "file_name": "Report.pdf"}]),
        );

        let (status, body) = app
            .call(Method::GET, &app.field_uri("attachments", "/files/docs/a.pdf"), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["temporaryUrl"].as_str().unwrap().contains("docs/a.pdf"));
        assert_eq!(
            app.objects.last_disposition().as_deref(),
            Some("attachment; filename=\"Report.pdf\"")
        );
    }

    #[tokio::test]
    async fn test_download_keeps_non_ascii_name() {
        let app = TestApp::new();
        app.objects.put("docs/r.pdf");
        app.store.set_field(
            &app.owner,
            "attachments",
            json!([{"file_key": "docs/r.pdf", "file_name": "Résumé.pdf"}]),
        );

        let (status, _) = app
            .call(Method::GET, &app.field_uri("attachments", "/files/docs/r.pdf"), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            app.objects.last_disposition().as_deref(),
            Some("attachment; filename=\"R_sum_.pdf\"; filename*=UTF-8''R%C3%A9sum%C3%A9.pdf")
        );
    }

    #[tokio::test]
    async fn test_download_missing_object_is_not_found() {
        let app = TestApp::new();
        app.store.set_field(
            &app.owner,
            "attachments",
            json!([{"file_key": "docs/gone.pdf"}]),
        );

        let (status, body) = app
            .call(
                Method::GET,
                &app.field_uri("attachments", "/files/docs/gone.pdf"),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_destroy_keeps_sibling_order() {
        let app = TestApp::new();
        for key in ["docs/a", "docs/b", "docs/c"] {
            app.objects.put(key);
        }
        app.store.set_field(
            &app.owner,
            "attachments",
            json!([{"file_key": "docs/a"}, {"file_key": "docs/b"}, {"file_key": "docs/c"}]),
        );

        let (status, body) = app
            .call(Method::DELETE, &app.field_uri("attachments", "/files/docs/b"), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "File deleted");
        assert_eq!(app.objects.deleted(), vec!["docs/b".to_string()]);

        let (_, listed) = app
            .call(Method::GET, &app.field_uri("attachments", "/files"), None)
            .await;
        assert_eq!(keys(&listed), vec!["docs/a", "docs/c"]);
    }

    #[tokio::test]
    async fn test_destroy_unknown_key_is_not_found() {
        let app = TestApp::new();
        let (status, _) = app
            .call(Method::DELETE, &app.field_uri("cover", "/files/covers/none.png"), None)
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(app.objects.deleted().is_empty());
    }

    #[tokio::test]
    async fn test_view_only_slot_denies_other_capabilities() {
        let app = TestApp::new();
        app.objects.put("ro/a.pdf");
        app.store
            .set_field(&app.owner, "readonly", json!({"file_key": "ro/a.pdf"}));

        let (status, _) = app
            .call(Method::GET, &app.field_uri("readonly", "/files"), None)
            .await;
        assert_eq!(status, StatusCode::OK);

        for (method, rest, body) in [
            (Method::POST, "/files", Some(json!({"fileKey": "ro/b.pdf"}))),
            (Method::GET, "/files/ro/a.pdf", None),
            (Method::DELETE, "/files/ro/a.pdf", None),
        ] {
            let (status, _) = app
                .call(method, &app.field_uri("readonly", rest), body)
                .await;
            assert_eq!(status, StatusCode::FORBIDDEN);
        }
        assert!(app.objects.deleted().is_empty());
        assert!(app.objects.contains("ro/a.pdf"));
    }

    #[tokio::test]
    async fn test_unknown_record_is_not_found() {
        let app = TestApp::new();
        let uri = format!(
            "/api/v1/resources/posts/{}/fields/cover/files",
            upvault_shared::types::RecordId::new()
        );
        let (status, _) = app.call(Method::GET, &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
