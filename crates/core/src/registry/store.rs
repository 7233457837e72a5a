//! Persistence seam for descriptors.

use async_trait::async_trait;
use serde_json::{Map, Value};

use super::error::RegistryError;
use super::types::OwnerRef;

/// Pure rewrite of a field value, applied while the record is locked.
/// Receives the current value (`None` when unset) and returns the new one.
pub type FieldUpdate<'a> = &'a (dyn Fn(Option<Value>) -> Option<Value> + Send + Sync);

/// Owning-record storage the registry reads and writes.
///
/// Implemented by the db crate. Field values hold `Single` and `Multiple`
/// descriptors; related rows hold relational ones, keyed by their storage
/// columns.
#[async_trait]
pub trait DescriptorStore: Send + Sync {
    /// Whether the owning record exists.
    async fn record_exists(&self, owner: &OwnerRef) -> Result<bool, RegistryError>;

    /// Current value of a structured field on the record.
    async fn field_value(
        &self,
        owner: &OwnerRef,
        field: &str,
    ) -> Result<Option<Value>, RegistryError>;

    /// Overwrite a structured field. `None` clears it.
    async fn set_field_value(
        &self,
        owner: &OwnerRef,
        field: &str,
        value: Option<Value>,
    ) -> Result<(), RegistryError>;

    /// Read-modify-write of a structured field as one atomic step.
    ///
    /// Concurrent updates to the same record serialize; none is lost.
    async fn update_field_value(
        &self,
        owner: &OwnerRef,
        field: &str,
        update: FieldUpdate<'_>,
    ) -> Result<(), RegistryError>;

    /// Related rows for the record, oldest first.
    async fn related_rows(
        &self,
        owner: &OwnerRef,
        relation: &str,
    ) -> Result<Vec<Map<String, Value>>, RegistryError>;

    /// Insert one related row.
    async fn insert_related_row(
        &self,
        owner: &OwnerRef,
        relation: &str,
        file_key: &str,
        row: Map<String, Value>,
    ) -> Result<(), RegistryError>;

    /// Delete related rows, all of them or only those with `file_key`.
    /// Returns the number of rows removed.
    async fn delete_related_rows(
        &self,
        owner: &OwnerRef,
        relation: &str,
        file_key: Option<&str>,
    ) -> Result<u64, RegistryError>;
}
