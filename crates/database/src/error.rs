use crate::filter::{Entity, Field};
use crate::store::Measure;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Failed to load environment variables for database connection: {0}")]
    ConnectionConfigError(String),

    #[error("Database query failed: {0}")]
    QueryError(#[from] sqlx::Error),

    #[error("Database migration failed: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),

    #[error("{entity} cannot be filtered by {field}")]
    UnsupportedFilter { entity: Entity, field: Field },

    #[error("{record} references missing {parent} {id}")]
    MissingParent {
        record: &'static str,
        parent: &'static str,
        id: Uuid,
    },

    #[error("Aggregate of {0:?} overflowed")]
    Overflow(Measure),

    #[error("The in-memory store lock was poisoned by a panicking writer.")]
    Poisoned,
}
