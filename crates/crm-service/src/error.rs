//! Errors raised by the service collaborators.
//!
//! Neither kind aborts a request: the services log them and carry on.

use std::fmt;

use crm_core::error::CrmError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("mail transport rejected the message: {0}")]
    Transport(String),

    #[error("invalid recipient: {0}")]
    InvalidRecipient(String),
}

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("search index unavailable: {0}")]
    Unavailable(String),
}

/// A reference field pointing at a record that does not exist or that
/// the caller cannot see.
pub(crate) fn invalid_reference(field: &str, id: impl fmt::Display) -> CrmError {
    CrmError::validation(
        field,
        format!("Invalid pk \"{id}\" - object does not exist."),
    )
}
