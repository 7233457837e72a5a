//! In-memory fakes for the storage and persistence seams.
//!
//! Compiled for this crate's tests and, through the `testing` feature, for
//! downstream crates' tests.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::registry::{DescriptorStore, FieldUpdate, OwnerRef, RegistryError};
use crate::storage::{
    CompletedPart, CompletedUpload, MultipartSigner, ObjectStore, PresignedUrl, SignerError,
    StorageError, UploadSession, UploadedPart, content_disposition,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Calls made to each multipart primitive.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SignerCalls {
    /// `create_multipart_upload` calls.
    pub create: usize,
    /// `sign_upload_part` calls.
    pub sign_part: usize,
    /// `list_parts` calls.
    pub list: usize,
    /// `complete_multipart_upload` calls.
    pub complete: usize,
    /// `abort_multipart_upload` calls.
    pub abort: usize,
}

impl SignerCalls {
    /// Calls across all primitives.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.create + self.sign_part + self.list + self.complete + self.abort
    }
}

/// A recorded `create_multipart_upload` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedUpload {
    /// Object key.
    pub key: String,
    /// Content type sent to storage.
    pub content_type: String,
    /// Metadata sent to storage.
    pub metadata: HashMap<String, String>,
}

#[derive(Debug, Default)]
struct SignerState {
    calls: SignerCalls,
    created: Vec<CreatedUpload>,
    completed: Vec<Vec<CompletedPart>>,
    parts: HashMap<String, Vec<UploadedPart>>,
    failure: Option<String>,
}

/// Multipart signer that records calls and never touches the network.
#[derive(Debug, Default)]
pub struct FakeSigner {
    state: Mutex<SignerState>,
}

impl FakeSigner {
    /// Create a signer where every call succeeds.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every later call fail with a backend error carrying `message`.
    pub fn fail_with(&self, message: impl Into<String>) {
        lock(&self.state).failure = Some(message.into());
    }

    /// Parts `list_parts` reports for `upload_id`.
    pub fn set_parts(&self, upload_id: &str, parts: Vec<UploadedPart>) {
        lock(&self.state).parts.insert(upload_id.to_string(), parts);
    }

    /// Call counts so far.
    #[must_use]
    pub fn calls(&self) -> SignerCalls {
        lock(&self.state).calls
    }

    /// Sessions created so far.
    #[must_use]
    pub fn created(&self) -> Vec<CreatedUpload> {
        lock(&self.state).created.clone()
    }

    /// Part lists received by `complete_multipart_upload`, in call order.
    #[must_use]
    pub fn completed_parts(&self) -> Vec<Vec<CompletedPart>> {
        lock(&self.state).completed.clone()
    }

    fn check(state: &SignerState, operation: &'static str) -> Result<(), SignerError> {
        match &state.failure {
            Some(message) => Err(SignerError::backend(operation, message.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl MultipartSigner for FakeSigner {
    async fn create_multipart_upload(
        &self,
        key: &str,
        content_type: &str,
        metadata: &HashMap<String, String>,
    ) -> Result<UploadSession, SignerError> {
        let mut state = lock(&self.state);
        state.calls.create += 1;
        Self::check(&state, "CreateMultipartUpload")?;
        state.created.push(CreatedUpload {
            key: key.to_string(),
            content_type: content_type.to_string(),
            metadata: metadata.clone(),
        });
        Ok(UploadSession {
            key: key.to_string(),
            upload_id: format!("upload-{}", state.created.len()),
        })
    }

    async fn sign_upload_part(
        &self,
        key: &str,
        upload_id: &str,
        part_number: u32,
    ) -> Result<PresignedUrl, SignerError> {
        let mut state = lock(&self.state);
        state.calls.sign_part += 1;
        Self::check(&state, "UploadPart")?;
        Ok(PresignedUrl {
            url: format!(
                "https://fake-s3.test/{key}?partNumber={part_number}&uploadId={upload_id}"
            ),
            method: "PUT".to_string(),
            expires_at: PresignedUrl::expiry_from_now(1200),
            headers: HashMap::new(),
        })
    }

    async fn list_parts(
        &self,
        _key: &str,
        upload_id: &str,
    ) -> Result<Vec<UploadedPart>, SignerError> {
        let mut state = lock(&self.state);
        state.calls.list += 1;
        Self::check(&state, "ListParts")?;
        Ok(state.parts.get(upload_id).cloned().unwrap_or_default())
    }

    async fn complete_multipart_upload(
        &self,
        key: &str,
        _upload_id: &str,
        parts: &[CompletedPart],
    ) -> Result<CompletedUpload, SignerError> {
        let mut state = lock(&self.state);
        state.calls.complete += 1;
        Self::check(&state, "CompleteMultipartUpload")?;
        state.completed.push(parts.to_vec());
        Ok(CompletedUpload {
            location: format!("https://fake-s3.test/{key}"),
        })
    }

    async fn abort_multipart_upload(&self, _key: &str, _upload_id: &str) -> Result<(), SignerError> {
        let mut state = lock(&self.state);
        state.calls.abort += 1;
        Self::check(&state, "AbortMultipartUpload")
    }
}

#[derive(Debug, Default)]
struct ObjectState {
    objects: HashSet<String>,
    deleted: Vec<String>,
    last_disposition: Option<String>,
}

/// Object store backed by a set of keys.
#[derive(Debug, Default)]
pub struct InMemoryObjectStore {
    state: Mutex<ObjectState>,
}

impl InMemoryObjectStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pretend an object was uploaded at `key`.
    pub fn put(&self, key: &str) {
        lock(&self.state).objects.insert(key.to_string());
    }

    /// Whether an object exists at `key`.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        lock(&self.state).objects.contains(key)
    }

    /// Keys passed to `delete`, in call order.
    #[must_use]
    pub fn deleted(&self) -> Vec<String> {
        lock(&self.state).deleted.clone()
    }

    /// Content-Disposition requested by the latest download presign.
    #[must_use]
    pub fn last_disposition(&self) -> Option<String> {
        lock(&self.state).last_disposition.clone()
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self.contains(key))
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let mut state = lock(&self.state);
        state.objects.remove(key);
        state.deleted.push(key.to_string());
        Ok(())
    }

    async fn presign_download(
        &self,
        key: &str,
        filename: &str,
    ) -> Result<PresignedUrl, StorageError> {
        let mut state = lock(&self.state);
        if !state.objects.contains(key) {
            return Err(StorageError::not_found(key));
        }
        state.last_disposition = Some(content_disposition(filename));
        Ok(PresignedUrl {
            url: format!("https://fake-s3.test/{key}?download={filename}"),
            method: "GET".to_string(),
            expires_at: PresignedUrl::expiry_from_now(300),
            headers: HashMap::new(),
        })
    }
}

#[derive(Debug, Default)]
struct RecordState {
    records: HashSet<OwnerRef>,
    fields: HashMap<(OwnerRef, String), Value>,
    rows: HashMap<(OwnerRef, String), Vec<(String, Map<String, Value>)>>,
}

/// Descriptor store holding records in memory.
#[derive(Debug, Default)]
pub struct InMemoryDescriptorStore {
    state: Mutex<RecordState>,
}

impl InMemoryDescriptorStore {
    /// Create a store with no records.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an owning record.
    pub fn add_record(&self, owner: &OwnerRef) {
        lock(&self.state).records.insert(owner.clone());
    }

    /// Raw value of a record field.
    #[must_use]
    pub fn field(&self, owner: &OwnerRef, field: &str) -> Option<Value> {
        lock(&self.state)
            .fields
            .get(&(owner.clone(), field.to_string()))
            .cloned()
    }

    /// Overwrite a record field directly.
    pub fn set_field(&self, owner: &OwnerRef, field: &str, value: Value) {
        lock(&self.state)
            .fields
            .insert((owner.clone(), field.to_string()), value);
    }

    /// Related rows for a record.
    #[must_use]
    pub fn rows(&self, owner: &OwnerRef, relation: &str) -> Vec<Map<String, Value>> {
        lock(&self.state)
            .rows
            .get(&(owner.clone(), relation.to_string()))
            .map(|rows| rows.iter().map(|(_, row)| row.clone()).collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl DescriptorStore for InMemoryDescriptorStore {
    async fn record_exists(&self, owner: &OwnerRef) -> Result<bool, RegistryError> {
        Ok(lock(&self.state).records.contains(owner))
    }

    async fn field_value(
        &self,
        owner: &OwnerRef,
        field: &str,
    ) -> Result<Option<Value>, RegistryError> {
        Ok(self.field(owner, field))
    }

    async fn set_field_value(
        &self,
        owner: &OwnerRef,
        field: &str,
        value: Option<Value>,
    ) -> Result<(), RegistryError> {
        self.update_field_value(owner, field, &|_| value.clone()).await
    }

    async fn update_field_value(
        &self,
        owner: &OwnerRef,
        field: &str,
        update: FieldUpdate<'_>,
    ) -> Result<(), RegistryError> {
        let mut state = lock(&self.state);
        let slot = (owner.clone(), field.to_string());
        match update(state.fields.get(&slot).cloned()) {
            Some(value) => state.fields.insert(slot, value),
            None => state.fields.remove(&slot),
        };
        Ok(())
    }

    async fn related_rows(
        &self,
        owner: &OwnerRef,
        relation: &str,
    ) -> Result<Vec<Map<String, Value>>, RegistryError> {
        Ok(self.rows(owner, relation))
    }

    async fn insert_related_row(
        &self,
        owner: &OwnerRef,
        relation: &str,
        file_key: &str,
        row: Map<String, Value>,
    ) -> Result<(), RegistryError> {
        lock(&self.state)
            .rows
            .entry((owner.clone(), relation.to_string()))
            .or_default()
            .push((file_key.to_string(), row));
        Ok(())
    }

    async fn delete_related_rows(
        &self,
        owner: &OwnerRef,
        relation: &str,
        file_key: Option<&str>,
    ) -> Result<u64, RegistryError> {
        let mut state = lock(&self.state);
        let Some(rows) = state.rows.get_mut(&(owner.clone(), relation.to_string())) else {
            return Ok(0);
        };
        let before = rows.len();
        match file_key {
            Some(key) => rows.retain(|(row_key, _)| row_key != key),
            None => rows.clear(),
        }
        Ok(u64::try_from(before - rows.len()).unwrap_or(u64::MAX))
    }
}
