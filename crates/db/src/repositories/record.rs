//! Record repository for descriptor persistence.
//!
//! Implements the file registry's `DescriptorStore` using SeaORM.

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde_json::{Map, Value};
use upvault_core::registry::{DescriptorStore, FieldUpdate, OwnerRef, RegistryError};
use upvault_shared::types::{DescriptorRowId, RecordId};

use crate::entities::{record_files, records};

fn repo_err(e: DbErr) -> RegistryError {
    RegistryError::repository(e.to_string())
}

/// Record repository implementation.
#[derive(Debug, Clone)]
pub struct RecordRepository {
    db: DatabaseConnection,
}

impl RecordRepository {
    /// Create a new record repository.
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Create an owning record with no attachments.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails.
    pub async fn create_record(&self, resource: &str) -> Result<RecordId, DbErr> {
        let id = RecordId::new();
        let now = Utc::now();
        records::ActiveModel {
            id: Set(id.into_inner()),
            resource: Set(resource.to_string()),
            fields: Set(Value::Object(Map::new())),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        }
        .insert(&self.db)
        .await?;
        Ok(id)
    }

    async fn find_record(&self, owner: &OwnerRef) -> Result<Option<records::Model>, RegistryError> {
        records::Entity::find_by_id(owner.record_id.into_inner())
            .filter(records::Column::Resource.eq(owner.resource.as_str()))
            .one(&self.db)
            .await
            .map_err(repo_err)
    }
}

#[async_trait]
impl DescriptorStore for RecordRepository {
    async fn record_exists(&self, owner: &OwnerRef) -> Result<bool, RegistryError> {
        let count = records::Entity::find_by_id(owner.record_id.into_inner())
            .filter(records::Column::Resource.eq(owner.resource.as_str()))
            .count(&self.db)
            .await
            .map_err(repo_err)?;
        Ok(count > 0)
    }

    async fn field_value(
        &self,
        owner: &OwnerRef,
        field: &str,
    ) -> Result<Option<Value>, RegistryError> {
        Ok(self
            .find_record(owner)
            .await?
            .and_then(|record| record.fields.get(field).cloned())
            .filter(|v| !v.is_null()))
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
        let txn = self.db.begin().await.map_err(repo_err)?;

        // Row lock: concurrent writers to any field of this record serialize here.
        let record = records::Entity::find_by_id(owner.record_id.into_inner())
            .filter(records::Column::Resource.eq(owner.resource.as_str()))
            .lock_exclusive()
            .one(&txn)
            .await
            .map_err(repo_err)?
            .ok_or_else(|| RegistryError::RecordNotFound {
                resource: owner.resource.clone(),
                record_id: owner.record_id.to_string(),
            })?;

        let mut fields = match record.fields.clone() {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        let current = fields.remove(field).filter(|v| !v.is_null());
        if let Some(value) = update(current) {
            fields.insert(field.to_string(), value);
        }

        let mut active: records::ActiveModel = record.into();
        active.fields = Set(Value::Object(fields));
        active.updated_at = Set(Utc::now().into());
        active.update(&txn).await.map_err(repo_err)?;

        txn.commit().await.map_err(repo_err)
    }

    async fn related_rows(
        &self,
        owner: &OwnerRef,
        relation: &str,
    ) -> Result<Vec<Map<String, Value>>, RegistryError> {
        let models = record_files::Entity::find()
            .filter(record_files::Column::RecordId.eq(owner.record_id.into_inner()))
            .filter(record_files::Column::Relation.eq(relation))
            .order_by_asc(record_files::Column::CreatedAt)
            .order_by_asc(record_files::Column::Id)
            .all(&self.db)
            .await
            .map_err(repo_err)?;

        Ok(models
            .into_iter()
            .filter_map(|model| match model.columns {
                Value::Object(row) => Some(row),
                _ => None,
            })
            .collect())
    }

    async fn insert_related_row(
        &self,
        owner: &OwnerRef,
        relation: &str,
        file_key: &str,
        row: Map<String, Value>,
    ) -> Result<(), RegistryError> {
        record_files::ActiveModel {
            id: Set(DescriptorRowId::new().into_inner()),
            record_id: Set(owner.record_id.into_inner()),
            relation: Set(relation.to_string()),
            file_key: Set(file_key.to_string()),
            columns: Set(Value::Object(row)),
            created_at: Set(Utc::now().into()),
        }
        .insert(&self.db)
        .await
        .map_err(repo_err)?;
        Ok(())
    }

    async fn delete_related_rows(
        &self,
        owner: &OwnerRef,
        relation: &str,
        file_key: Option<&str>,
    ) -> Result<u64, RegistryError> {
        let mut query = record_files::Entity::delete_many()
            .filter(record_files::Column::RecordId.eq(owner.record_id.into_inner()))
            .filter(record_files::Column::Relation.eq(relation));
        if let Some(key) = file_key {
            query = query.filter(record_files::Column::FileKey.eq(key));
        }

        let result = query.exec(&self.db).await.map_err(repo_err)?;
        Ok(result.rows_affected)
    }
}
