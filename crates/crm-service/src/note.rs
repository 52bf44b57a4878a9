//! Appointment note service.
//!
//! Notes have no organization of their own and are authorized through
//! the first appointment they are linked to.

use crm_core::error::{CrmError, CrmResult};
use crm_core::guard::{authorize_note, list_scope};
use crm_core::identity::IdentityContext;
use crm_core::models::appointment::Appointment;
use crm_core::models::note::{AppointmentNote, UpdateAppointmentNote};
use crm_core::notes::DUPLICATE_TYPE_MESSAGE;
use crm_core::repository::{AppointmentNoteRepository, AppointmentRepository};
use tracing::info;
use uuid::Uuid;

pub struct NoteService<N: AppointmentNoteRepository, A: AppointmentRepository> {
    notes: N,
    appointments: A,
}

impl<N: AppointmentNoteRepository, A: AppointmentRepository> NoteService<N, A> {
    pub fn new(notes: N, appointments: A) -> Self {
        Self {
            notes,
            appointments,
        }
    }

    pub async fn list(&self, identity: &IdentityContext) -> CrmResult<Vec<AppointmentNote>> {
        let scope = list_scope(identity)?;
        self.notes.list(scope).await
    }

    pub async fn get(&self, identity: &IdentityContext, id: Uuid) -> CrmResult<AppointmentNote> {
        self.load(identity, id).await.map(|(note, _)| note)
    }

    pub async fn update(
        &self,
        identity: &IdentityContext,
        id: Uuid,
        update: UpdateAppointmentNote,
    ) -> CrmResult<AppointmentNote> {
        let (mut note, parent) = self.load(identity, id).await?;
        update.apply_to(&mut note);

        // The parent may not end up with two notes of one type.
        if let Some(parent) = parent {
            let clash = parent
                .notes
                .iter()
                .any(|other| other.id != note.id && other.kind == note.kind);
            if clash {
                return Err(CrmError::validation("type", DUPLICATE_TYPE_MESSAGE));
            }
        }

        let note = self.notes.update(&note).await?;
        info!(note_id = %id, "Appointment note updated");
        Ok(note)
    }

    pub async fn delete(&self, identity: &IdentityContext, id: Uuid) -> CrmResult<()> {
        self.load(identity, id).await?;
        self.notes.delete(id).await?;
        info!(note_id = %id, "Appointment note deleted");
        Ok(())
    }

    /// Load a note the caller may act on, together with the appointment
    /// that authorized it.
    async fn load(
        &self,
        identity: &IdentityContext,
        id: Uuid,
    ) -> CrmResult<(AppointmentNote, Option<Appointment>)> {
        identity.require_authenticated()?;
        let note = self.notes.get_by_id(id).await?;

        let parent_ids = self.notes.parent_ids(id).await?;
        let parent = match parent_ids.first() {
            Some(&appointment_id) => match self.appointments.get_by_id(appointment_id).await {
                Ok(appointment) => Some(appointment),
                Err(CrmError::NotFound { .. }) => None,
                Err(e) => return Err(e),
            },
            None => None,
        };

        authorize_note(identity, parent.as_slice()).into_result()?;
        Ok((note, parent))
    }
}
