//! Initial schema: owning records and relational descriptor rows.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(INITIAL_SQL).await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(
            "DROP TABLE IF EXISTS record_files CASCADE; DROP TABLE IF EXISTS records CASCADE;",
        )
        .await?;
        Ok(())
    }
}

const INITIAL_SQL: &str = r"
-- Owning records; single and multiple attachment fields are stored in fields
CREATE TABLE records (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    resource VARCHAR(100) NOT NULL,
    fields JSONB NOT NULL DEFAULT '{}'::jsonb,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_fields_object CHECK (jsonb_typeof(fields) = 'object')
);

CREATE INDEX idx_records_resource ON records(resource);

-- Descriptor rows for relational attachment slots
CREATE TABLE record_files (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    record_id UUID NOT NULL REFERENCES records(id) ON DELETE CASCADE,
    relation VARCHAR(100) NOT NULL,
    file_key TEXT NOT NULL,
    columns JSONB NOT NULL DEFAULT '{}'::jsonb,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_file_key_not_empty CHECK (file_key <> '')
);

-- One descriptor per key per owning record and relation
CREATE UNIQUE INDEX idx_record_files_key ON record_files(record_id, relation, file_key);

-- Listing in insertion order
CREATE INDEX idx_record_files_listing ON record_files(record_id, relation, created_at);
";
