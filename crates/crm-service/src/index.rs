//! Search-index collaborator.
//!
//! Contacts and appointments are pushed to an external full-text index
//! after every save and removed after every delete. Index failures never
//! fail the request.

use crm_core::models::appointment::Appointment;
use crm_core::models::contact::Contact;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::IndexError;

pub trait SearchIndex: Send + Sync {
    fn index_contact(&self, contact: &Contact)
    -> impl Future<Output = Result<(), IndexError>> + Send;
    fn index_appointment(
        &self,
        appointment: &Appointment,
    ) -> impl Future<Output = Result<(), IndexError>> + Send;
    fn remove_contact(&self, id: Uuid) -> impl Future<Output = Result<(), IndexError>> + Send;
    fn remove_appointment(&self, id: Uuid) -> impl Future<Output = Result<(), IndexError>> + Send;
}

/// Does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopIndex;

impl SearchIndex for NoopIndex {
    async fn index_contact(&self, _contact: &Contact) -> Result<(), IndexError> {
        Ok(())
    }

    async fn index_appointment(&self, _appointment: &Appointment) -> Result<(), IndexError> {
        Ok(())
    }

    async fn remove_contact(&self, _id: Uuid) -> Result<(), IndexError> {
        Ok(())
    }

    async fn remove_appointment(&self, _id: Uuid) -> Result<(), IndexError> {
        Ok(())
    }
}

/// Writes index operations to the debug log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogIndex;

impl SearchIndex for LogIndex {
    async fn index_contact(&self, contact: &Contact) -> Result<(), IndexError> {
        debug!(contact_id = %contact.id, organization_id = %contact.organization_id, "Index contact");
        Ok(())
    }

    async fn index_appointment(&self, appointment: &Appointment) -> Result<(), IndexError> {
        debug!(
            appointment_id = %appointment.id,
            organization_id = %appointment.organization_id,
            "Index appointment"
        );
        Ok(())
    }

    async fn remove_contact(&self, id: Uuid) -> Result<(), IndexError> {
        debug!(contact_id = %id, "Remove contact from index");
        Ok(())
    }

    async fn remove_appointment(&self, id: Uuid) -> Result<(), IndexError> {
        debug!(appointment_id = %id, "Remove appointment from index");
        Ok(())
    }
}

/// Log an index failure; the write it followed already succeeded.
pub(crate) fn log_index_failure(result: Result<(), IndexError>, record_id: Uuid) {
    if let Err(e) = result {
        warn!(record_id = %record_id, error = %e, "Search index update failed");
    }
}
