//! `SeaORM` Entity for records table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// An owning record. Structured attachment fields live in `fields`, keyed by
/// slot name.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "records")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub resource: String,
    #[sea_orm(column_type = "JsonBinary")]
    pub fields: Json,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::record_files::Entity")]
    RecordFiles,
}

impl Related<super::record_files::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::RecordFiles.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
