//! File registry: descriptors attached to an owning record's slot.

use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{error, info};

use super::error::RegistryError;
use super::store::DescriptorStore;
use super::types::{FileDescriptor, ListedFile, OwnerRef};
use crate::access::{Cardinality, SlotConfig};
use crate::storage::{ObjectStore, PresignedUrl};
use crate::upload::validate_key;

/// Lists, stores, downloads, and destroys descriptors for one slot at a time.
///
/// Object deletion always happens before the descriptor update and the two
/// are not transactional: a failure in between leaves a stale descriptor or
/// an orphaned object.
#[derive(Clone)]
pub struct FileRegistry {
    store: Arc<dyn DescriptorStore>,
    objects: Arc<dyn ObjectStore>,
    public_url: String,
}

impl std::fmt::Debug for FileRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileRegistry")
            .field("public_url", &self.public_url)
            .finish_non_exhaustive()
    }
}

impl FileRegistry {
    /// Create a registry. `public_url` is the externally visible API base
    /// used for relational retrieval URLs.
    #[must_use]
    pub fn new(
        store: Arc<dyn DescriptorStore>,
        objects: Arc<dyn ObjectStore>,
        public_url: impl Into<String>,
    ) -> Self {
        Self {
            store,
            objects,
            public_url: public_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Attached descriptors on the slot.
    ///
    /// # Errors
    ///
    /// `RecordNotFound` if the owner is missing; repository failures otherwise.
    pub async fn list(
        &self,
        owner: &OwnerRef,
        slot: &SlotConfig,
    ) -> Result<Vec<ListedFile>, RegistryError> {
        self.ensure_record(owner).await?;

        Ok(self
            .descriptors(owner, slot)
            .await?
            .into_iter()
            .filter(FileDescriptor::is_attached)
            .map(|descriptor| {
                let url = slot
                    .cardinality
                    .is_relational()
                    .then(|| self.retrieval_url(owner, slot, &descriptor.file_key));
                ListedFile { descriptor, url }
            })
            .collect())
    }

    /// Persist a descriptor for an uploaded object.
    ///
    /// # Errors
    ///
    /// `Validation` for an empty key or one outside the slot; `RecordNotFound`
    /// if the owner is missing.
    pub async fn store(
        &self,
        owner: &OwnerRef,
        slot: &SlotConfig,
        descriptor: FileDescriptor,
    ) -> Result<(), RegistryError> {
        if descriptor.file_key.trim().is_empty() {
            return Err(RegistryError::validation("fileKey is required"));
        }
        validate_key(&descriptor.file_key, slot)
            .map_err(|e| RegistryError::validation(e.to_string()))?;
        self.ensure_record(owner).await?;

        let key = descriptor.file_key.as_str();
        let row = descriptor.to_row(&slot.columns);

        match slot.cardinality {
            Cardinality::Single => {
                let previous = self
                    .store
                    .field_value(owner, &slot.name)
                    .await?
                    .and_then(|v| single_descriptor(&v, slot));
                if let Some(previous) = previous.filter(|p| p.is_attached() && p.file_key != key)
                {
                    self.objects.delete(&previous.file_key).await?;
                    info!(key = %previous.file_key, slot = %slot.name, "replaced object deleted");
                }
                self.store
                    .set_field_value(owner, &slot.name, Some(Value::Object(row)))
                    .await?;
            }
            Cardinality::Multiple => {
                let row = Value::Object(row);
                self.store
                    .update_field_value(owner, &slot.name, &|current| {
                        let mut entries = list_entries(current);
                        entries.retain(|entry| entry_key(entry, slot) != Some(key));
                        entries.push(row.clone());
                        Some(Value::Array(entries))
                    })
                    .await?;
            }
            Cardinality::RelationalOne => {
                let relation = slot.relation_name();
                self.store.delete_related_rows(owner, relation, None).await?;
                self.store.insert_related_row(owner, relation, key, row).await?;
            }
            Cardinality::RelationalMany => {
                let relation = slot.relation_name();
                self.store
                    .delete_related_rows(owner, relation, Some(key))
                    .await?;
                self.store.insert_related_row(owner, relation, key, row).await?;
            }
        }

        info!(
            key = %key,
            resource = %owner.resource,
            record_id = %owner.record_id,
            slot = %slot.name,
            "descriptor stored"
        );
        Ok(())
    }

    /// Short-lived download URL for a stored object.
    ///
    /// # Errors
    ///
    /// `DescriptorNotFound` when the slot has no such key, `ObjectNotFound`
    /// when storage no longer has the object.
    pub async fn download(
        &self,
        owner: &OwnerRef,
        slot: &SlotConfig,
        file_key: &str,
    ) -> Result<PresignedUrl, RegistryError> {
        self.ensure_record(owner).await?;
        let descriptor = self.find(owner, slot, file_key).await?;

        if !self.objects.exists(&descriptor.file_key).await? {
            return Err(RegistryError::ObjectNotFound(file_key.to_string()));
        }

        Ok(self
            .objects
            .presign_download(&descriptor.file_key, descriptor.download_name())
            .await?)
    }

    /// Delete the object, then its descriptor.
    ///
    /// # Errors
    ///
    /// `DescriptorNotFound` when the slot has no such key.
    pub async fn destroy(
        &self,
        owner: &OwnerRef,
        slot: &SlotConfig,
        file_key: &str,
    ) -> Result<(), RegistryError> {
        self.ensure_record(owner).await?;
        self.find(owner, slot, file_key).await?;

        self.objects.delete(file_key).await?;

        let removed = match slot.cardinality {
            Cardinality::Single => self.store.set_field_value(owner, &slot.name, None).await,
            Cardinality::Multiple => {
                self.store
                    .update_field_value(owner, &slot.name, &|current| {
                        let mut entries = list_entries(current);
                        entries.retain(|entry| entry_key(entry, slot) != Some(file_key));
                        Some(Value::Array(entries))
                    })
                    .await
            }
            Cardinality::RelationalOne | Cardinality::RelationalMany => self
                .store
                .delete_related_rows(owner, slot.relation_name(), Some(file_key))
                .await
                .map(|_| ()),
        };

        if let Err(e) = removed {
            error!(key = %file_key, slot = %slot.name, error = %e, "object deleted but descriptor was not removed");
            return Err(e);
        }

        info!(
            key = %file_key,
            resource = %owner.resource,
            record_id = %owner.record_id,
            slot = %slot.name,
            "descriptor destroyed"
        );
        Ok(())
    }

    async fn ensure_record(&self, owner: &OwnerRef) -> Result<(), RegistryError> {
        if self.store.record_exists(owner).await? {
            Ok(())
        } else {
            Err(RegistryError::RecordNotFound {
                resource: owner.resource.clone(),
                record_id: owner.record_id.to_string(),
            })
        }
    }

    async fn find(
        &self,
        owner: &OwnerRef,
        slot: &SlotConfig,
        file_key: &str,
    ) -> Result<FileDescriptor, RegistryError> {
        if file_key.is_empty() {
            return Err(RegistryError::DescriptorNotFound(String::new()));
        }
        self.descriptors(owner, slot)
            .await?
            .into_iter()
            .find(|d| d.file_key == file_key)
            .ok_or_else(|| RegistryError::DescriptorNotFound(file_key.to_string()))
    }

    /// Every descriptor on the slot, attached or not.
    async fn descriptors(
        &self,
        owner: &OwnerRef,
        slot: &SlotConfig,
    ) -> Result<Vec<FileDescriptor>, RegistryError> {
        match slot.cardinality {
            Cardinality::Single => Ok(self
                .store
                .field_value(owner, &slot.name)
                .await?
                .and_then(|v| single_descriptor(&v, slot))
                .into_iter()
                .collect()),
            Cardinality::Multiple => Ok(self
                .list_value(owner, slot)
                .await?
                .iter()
                .filter_map(Value::as_object)
                .map(|row| FileDescriptor::from_row(row, &slot.columns))
                .collect()),
            Cardinality::RelationalOne | Cardinality::RelationalMany => Ok(self
                .store
                .related_rows(owner, slot.relation_name())
                .await?
                .iter()
                .map(|row| FileDescriptor::from_row(row, &slot.columns))
                .collect()),
        }
    }

    /// The raw list stored on a `Multiple` field. Non-array values read as
    /// empty.
    async fn list_value(
        &self,
        owner: &OwnerRef,
        slot: &SlotConfig,
    ) -> Result<Vec<Value>, RegistryError> {
        Ok(list_entries(self.store.field_value(owner, &slot.name).await?))
    }

    /// Every path segment is percent-encoded; key slashes stay separators.
    fn retrieval_url(&self, owner: &OwnerRef, slot: &SlotConfig, file_key: &str) -> String {
        let key = file_key
            .split('/')
            .map(urlencoding::encode)
            .collect::<Vec<_>>()
            .join("/");
        format!(
            "{}/api/v1/resources/{}/{}/fields/{}/files/{key}",
            self.public_url,
            urlencoding::encode(&owner.resource),
            owner.record_id,
            urlencoding::encode(&slot.name),
        )
    }
}

fn single_descriptor(value: &Value, slot: &SlotConfig) -> Option<FileDescriptor> {
    value
        .as_object()
        .map(|row| FileDescriptor::from_row(row, &slot.columns))
}

/// A `Multiple` field's entries; anything but an array counts as empty.
fn list_entries(value: Option<Value>) -> Vec<Value> {
    match value {
        Some(Value::Array(entries)) => entries,
        _ => Vec::new(),
    }
}

fn entry_key<'a>(entry: &'a Value, slot: &SlotConfig) -> Option<&'a str> {
    entry
        .as_object()
        .and_then(|row: &Map<String, Value>| row.get(slot.columns.file_key_column()))
        .and_then(Value::as_str)
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use upvault_shared::types::RecordId;

    use super::*;
    use crate::testing::{InMemoryDescriptorStore, InMemoryObjectStore};

    struct Fixture {
        registry: FileRegistry,
        store: Arc<InMemoryDescriptorStore>,
        objects: Arc<InMemoryObjectStore>,
        owner: OwnerRef,
    }

    fn fixture() -> Fixture {
        let owner = OwnerRef::new("posts", RecordId::new());
        let store = Arc::new(InMemoryDescriptorStore::new());
        store.add_record(&owner);
        let objects = Arc::new(InMemoryObjectStore::new());
        let registry = FileRegistry::new(store.clone(), objects.clone(), "https://api.test/");
        Fixture {
            registry,
            store,
            objects,
            owner,
        }
    }

    fn slot(cardinality: Cardinality) -> SlotConfig {
        let relation = cardinality.is_relational().then_some("post_files");
        SlotConfig::new("files")
            .with_prefix("docs")
            .with_cardinality(cardinality, relation)
    }

    #[tokio::test]
    async fn test_single_store_deletes_previous_object_once() {
        let f = fixture();
        let slot = slot(Cardinality::Single);
        f.objects.put("docs/old.pdf");
        f.objects.put("docs/new.pdf");

        f.registry
            .store(&f.owner, &slot, FileDescriptor::new("docs/old.pdf"))
            .await
            .unwrap();
        assert!(f.objects.deleted().is_empty());

        f.registry
            .store(&f.owner, &slot, FileDescriptor::new("docs/new.pdf").with_name("new.pdf"))
            .await
            .unwrap();

        assert_eq!(f.objects.deleted(), vec!["docs/old.pdf".to_string()]);
        assert_eq!(
            f.store.field(&f.owner, "files"),
            Some(json!({"file_key": "docs/new.pdf", "file_name": "new.pdf"}))
        );
    }

    #[tokio::test]
    async fn test_multiple_destroy_preserves_order() {
        let f = fixture();
        let slot = slot(Cardinality::Multiple);
        for key in ["docs/a", "docs/b", "docs/c"] {
            f.objects.put(key);
            f.registry
                .store(&f.owner, &slot, FileDescriptor::new(key))
                .await
                .unwrap();
        }

        f.registry.destroy(&f.owner, &slot, "docs/b").await.unwrap();

        let keys: Vec<String> = f
            .registry
            .list(&f.owner, &slot)
            .await
            .unwrap()
            .into_iter()
            .map(|l| l.descriptor.file_key)
            .collect();
        assert_eq!(keys, vec!["docs/a", "docs/c"]);
        assert_eq!(f.objects.deleted(), vec!["docs/b".to_string()]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_multiple_stores_keep_every_entry() {
        let f = fixture();
        let slot = Arc::new(slot(Cardinality::Multiple));

        let tasks: Vec<_> = (0..50)
            .map(|i| {
                let registry = f.registry.clone();
                let owner = f.owner.clone();
                let slot = Arc::clone(&slot);
                tokio::spawn(async move {
                    tokio::task::yield_now().await;
                    registry
                        .store(&owner, &slot, FileDescriptor::new(format!("docs/{i}.pdf")))
                        .await
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let listed = f.registry.list(&f.owner, &slot).await.unwrap();
        assert_eq!(listed.len(), 50);
    }

    #[tokio::test]
    async fn test_multiple_store_replaces_same_key() {
        let f = fixture();
        let slot = slot(Cardinality::Multiple);
        for descriptor in [
            FileDescriptor::new("docs/a").with_name("first"),
            FileDescriptor::new("docs/b"),
            FileDescriptor::new("docs/a").with_name("second"),
        ] {
            f.registry.store(&f.owner, &slot, descriptor).await.unwrap();
        }

        let listed = f.registry.list(&f.owner, &slot).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[1].descriptor.file_name.as_deref(), Some("second"));
    }

    #[tokio::test]
    async fn test_list_skips_unattached_descriptors() {
        let f = fixture();
        let slot = slot(Cardinality::Multiple);
        f.store.set_field(
            &f.owner,
            "files",
            json!([{"file_key": ""}, {"file_name": "orphan"}, {"file_key": "docs/a"}]),
        );

        let listed = f.registry.list(&f.owner, &slot).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].descriptor.file_key, "docs/a");
        assert_eq!(listed[0].url, None);
    }

    #[tokio::test]
    async fn test_relational_one_replaces_rows_and_lists_urls() {
        let f = fixture();
        let slot = slot(Cardinality::RelationalOne);
        for key in ["docs/a", "docs/b"] {
            f.registry
                .store(&f.owner, &slot, FileDescriptor::new(key))
                .await
                .unwrap();
        }

        let listed = f.registry.list(&f.owner, &slot).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(
            listed[0].url.as_deref(),
            Some(
                format!(
                    "https://api.test/api/v1/resources/posts/{}/fields/files/files/docs/b",
                    f.owner.record_id
                )
                .as_str()
            )
        );
        // Prior rows are removed, prior objects are not.
        assert!(f.objects.deleted().is_empty());
    }

    #[tokio::test]
    async fn test_retrieval_url_encodes_reserved_characters() {
        let f = fixture();
        let slot = slot(Cardinality::RelationalMany);
        f.registry
            .store(&f.owner, &slot, FileDescriptor::new("docs/a b#1?.png"))
            .await
            .unwrap();

        let listed = f.registry.list(&f.owner, &slot).await.unwrap();
        let url = listed[0].url.as_deref().unwrap();
        assert!(url.ends_with("/fields/files/files/docs/a%20b%231%3F.png"), "{url}");
        assert!(!url.contains([' ', '#', '?']), "{url}");
        assert_eq!(listed[0].descriptor.file_key, "docs/a b#1?.png");
    }

    #[tokio::test]
    async fn test_relational_many_appends_and_destroys_one() {
        let f = fixture();
        let slot = slot(Cardinality::RelationalMany);
        for key in ["docs/a", "docs/b"] {
            f.registry
                .store(&f.owner, &slot, FileDescriptor::new(key))
                .await
                .unwrap();
        }
        f.registry.destroy(&f.owner, &slot, "docs/a").await.unwrap();

        let rows = f.store.rows(&f.owner, "post_files");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["file_key"], "docs/b");
    }

    #[tokio::test]
    async fn test_download_requires_object_in_storage() {
        let f = fixture();
        let slot = slot(Cardinality::Single);
        f.registry
            .store(&f.owner, &slot, FileDescriptor::new("docs/report.pdf"))
            .await
            .unwrap();

        let err = f
            .registry
            .download(&f.owner, &slot, "docs/report.pdf")
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::ObjectNotFound(_)));

        f.objects.put("docs/report.pdf");
        let url = f
            .registry
            .download(&f.owner, &slot, "docs/report.pdf")
            .await
            .unwrap();
        assert!(url.url.contains("report.pdf"));
        assert_eq!(
            f.objects.last_disposition().as_deref(),
            Some("attachment; filename=\"report.pdf\"")
        );
    }

    #[tokio::test]
    async fn test_missing_descriptor_and_record() {
        let f = fixture();
        let slot = slot(Cardinality::Single);

        let err = f
            .registry
            .destroy(&f.owner, &slot, "docs/nope")
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::DescriptorNotFound(_)));
        assert!(f.objects.deleted().is_empty());

        let stranger = OwnerRef::new("posts", RecordId::new());
        let err = f.registry.list(&stranger, &slot).await.unwrap_err();
        assert!(matches!(err, RegistryError::RecordNotFound { .. }));
    }

    #[tokio::test]
    async fn test_store_validates_key() {
        let f = fixture();
        let slot = slot(Cardinality::Single);

        for key in ["", "other/a.pdf"] {
            let err = f
                .registry
                .store(&f.owner, &slot, FileDescriptor::new(key))
                .await
                .unwrap_err();
            assert!(matches!(err, RegistryError::Validation(_)));
        }
        assert_eq!(f.store.field(&f.owner, "files"), None);
    }
}
