//! Router harness over in-memory fakes.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{HeaderMap, Method, Request, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;
use upvault_core::access::{AccessGuard, Capability, Cardinality, ResourceCatalog, SlotConfig};
use upvault_core::registry::{FileRegistry, OwnerRef};
use upvault_core::testing::{FakeSigner, InMemoryDescriptorStore, InMemoryObjectStore};
use upvault_core::upload::UploadCoordinator;
use upvault_shared::types::RecordId;
use upvault_shared::{CorsConfig, JwtConfig, JwtService};
use uuid::Uuid;

use crate::{AppState, create_router};

pub struct TestApp {
    pub router: Router,
    pub signer: Arc<FakeSigner>,
    pub store: Arc<InMemoryDescriptorStore>,
    pub objects: Arc<InMemoryObjectStore>,
    pub owner: OwnerRef,
    jwt: Arc<JwtService>,
}

/// `posts` resource with one slot per cardinality plus a view-only slot.
pub fn catalog() -> ResourceCatalog {
    ResourceCatalog::default()
        .with_slot(
            "posts",
            SlotConfig::new("attachments")
                .with_prefix("docs")
                .preserving_filename()
                .with_cardinality(Cardinality::Multiple, None),
        )
        .with_slot("posts", SlotConfig::new("cover").with_prefix("covers"))
        .with_slot(
            "posts",
            SlotConfig::new("photos")
                .with_prefix("photos")
                .with_cardinality(Cardinality::RelationalMany, Some("post_photos")),
        )
        .with_slot(
            "posts",
            SlotConfig::new("readonly")
                .with_prefix("ro")
                .with_capabilities(&[Capability::View]),
        )
}

impl TestApp {
    pub fn new() -> Self {
        let signer = Arc::new(FakeSigner::new());
        let store = Arc::new(InMemoryDescriptorStore::new());
        let objects = Arc::new(InMemoryObjectStore::new());
        let jwt = Arc::new(JwtService::new(JwtConfig::default()));

        let owner = OwnerRef::new("posts", RecordId::new());
        store.add_record(&owner);

        let state = AppState {
            jwt_service: jwt.clone(),
            guard: AccessGuard::new(Arc::new(catalog())),
            coordinator: UploadCoordinator::new(signer.clone()),
            registry: FileRegistry::new(store.clone(), objects.clone(), "https://api.test"),
            cors: Arc::new(CorsConfig::default()),
        };

        Self {
            router: create_router(state),
            signer,
            store,
            objects,
            owner,
            jwt,
        }
    }

    pub fn token(&self) -> String {
        self.jwt
            .generate_access_token(Uuid::new_v4(), "editor")
            .expect("should generate token")
    }

    /// `/api/v1/resources/posts/{id}/fields/{field}{rest}`
    pub fn field_uri(&self, field: &str, rest: &str) -> String {
        format!(
            "/api/v1/resources/{}/{}/fields/{field}{rest}",
            self.owner.resource, self.owner.record_id
        )
    }

    /// Send an authenticated request.
    pub async fn call(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let token = self.token();
        let (status, _, json) = self.send(method, uri, Some(&token), body).await;
        (status, json)
    }

    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, HeaderMap, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .unwrap();

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, headers, json)
    }
}
