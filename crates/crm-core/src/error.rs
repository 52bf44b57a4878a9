//! Error types for the CRM service.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CrmError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    /// A unique constraint rejected the write (e.g. a duplicate
    /// `customer_id` within an organization).
    #[error("Integrity conflict: {cause}")]
    Conflict { cause: String },

    #[error("Authentication credentials were not provided")]
    AuthenticationRequired,

    #[error("Authorization denied: {reason}")]
    AuthorizationDenied { reason: String },

    /// Invalid input; `field` names the offending request field.
    #[error("Validation error on {field}: {message}")]
    Validation { field: String, message: String },

    #[error("Database error: {0}")]
    Database(String),

    #[error("Mail delivery failed: {0}")]
    Mail(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CrmError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn not_found(entity: impl Into<String>, id: impl ToString) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    pub fn denied(reason: impl Into<String>) -> Self {
        Self::AuthorizationDenied {
            reason: reason.into(),
        }
    }
}

pub type CrmResult<T> = Result<T, CrmError>;
