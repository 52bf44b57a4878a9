//! Database-specific error types and conversions.

use crm_core::error::CrmError;

/// Database-layer error type.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SurrealDB error: {0}")]
    Surreal(#[from] surrealdb::Error),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Record not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    /// A unique index rejected the write.
    #[error("Unique constraint violated: {0}")]
    Conflict(String),

    /// A stored value could not be turned back into a domain value.
    #[error("Corrupt record: {0}")]
    Decode(String),
}

impl DbError {
    /// Classify the error of a statement that failed at execution time.
    pub(crate) fn from_statement(err: surrealdb::Error) -> Self {
        let message = err.to_string();
        if message.contains("already contains") {
            DbError::Conflict(message)
        } else {
            DbError::Surreal(err)
        }
    }

    pub(crate) fn not_found(entity: &str, id: impl ToString) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }
}

impl From<DbError> for CrmError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => CrmError::NotFound { entity, id },
            DbError::Conflict(cause) => CrmError::Conflict { cause },
            other => CrmError::Database(other.to_string()),
        }
    }
}
