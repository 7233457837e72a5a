//! `SeaORM` entities.

pub mod record_files;
pub mod records;
