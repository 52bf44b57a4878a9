//! Appointment service.
//!
//! Appointment writes carry their notes inline. Notes are matched to the
//! stored ones by type and written in the same transaction as the
//! appointment row.

use std::collections::HashMap;

use crm_core::error::{CrmError, CrmResult};
use crm_core::filter::{AppointmentQuery, QueryParams};
use crm_core::guard::authorize;
use crm_core::identity::IdentityContext;
use crm_core::models::appointment::{
    Appointment, AppointmentInput, CreateAppointment, DenormalizedAppointment, UpdateAppointment,
};
use crm_core::models::contact::ContactName;
use crm_core::notes::{check_unique_types, reconcile};
use crm_core::pagination::{CursorConfig, CursorPage, CursorRequest, build_cursor_page};
use crm_core::repository::{AppointmentRepository, ContactRepository};
use crm_core::validation::validate_appointment;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::error::invalid_reference;
use crate::index::{SearchIndex, log_index_failure};

/// An appointment as returned to clients, optionally with the name of
/// its linked contact embedded.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum AppointmentView {
    Plain(Appointment),
    Denormalized(DenormalizedAppointment),
}

impl AppointmentView {
    pub fn appointment(&self) -> &Appointment {
        match self {
            AppointmentView::Plain(a) => a,
            AppointmentView::Denormalized(d) => &d.appointment,
        }
    }
}

pub struct AppointmentService<A, C, I>
where
    A: AppointmentRepository,
    C: ContactRepository,
    I: SearchIndex,
{
    appointments: A,
    contacts: C,
    index: I,
    cursor: CursorConfig,
}

impl<A, C, I> AppointmentService<A, C, I>
where
    A: AppointmentRepository,
    C: ContactRepository,
    I: SearchIndex,
{
    pub fn new(appointments: A, contacts: C, index: I) -> Self {
        Self {
            appointments,
            contacts,
            index,
            cursor: CursorConfig::DEFAULT,
        }
    }

    /// Use different page size bounds for listings.
    pub fn with_cursor_config(mut self, cursor: CursorConfig) -> Self {
        self.cursor = cursor;
        self
    }

    pub async fn list(
        &self,
        identity: &IdentityContext,
        params: &QueryParams,
        base_url: &str,
    ) -> CrmResult<CursorPage<AppointmentView>> {
        let query = AppointmentQuery::from_params(params, identity)?;
        let request = CursorRequest::from_params(params, self.cursor)?;

        let rows = self
            .appointments
            .list_page(&query.filter, query.ordering, &request)
            .await?;
        let field = query.ordering.field;
        let page = build_cursor_page(rows, &request, base_url, |a| a.sort_key(field));

        if !query.denormalize {
            return Ok(page.map(AppointmentView::Plain));
        }
        let names = self.contact_names(&page.results).await?;
        Ok(page.map(|appointment| denormalize(appointment, &names)))
    }

    pub async fn get(
        &self,
        identity: &IdentityContext,
        id: Uuid,
        denormalize_contact: bool,
    ) -> CrmResult<AppointmentView> {
        let appointment = self.load(identity, id).await?;
        if !denormalize_contact {
            return Ok(AppointmentView::Plain(appointment));
        }
        let names = self.contact_names(std::slice::from_ref(&appointment)).await?;
        Ok(denormalize(appointment, &names))
    }

    /// Load an appointment the caller may act on.
    pub async fn load(&self, identity: &IdentityContext, id: Uuid) -> CrmResult<Appointment> {
        identity.require_authenticated()?;
        let appointment = self.appointments.get_by_id(id).await?;
        authorize(identity, &appointment).into_result()?;
        Ok(appointment)
    }

    pub async fn create(
        &self,
        identity: &IdentityContext,
        input: AppointmentInput,
    ) -> CrmResult<Appointment> {
        let organization_id = identity.require_organization()?;
        let owner = identity.require_user()?;

        validate_appointment(&input.fields)?;
        check_unique_types(&input.notes)?;

        let plan = reconcile(&[], input.notes)?;
        let appointment = self
            .appointments
            .create(
                CreateAppointment {
                    owner,
                    organization_id,
                    fields: input.fields,
                },
                &plan.inserts,
            )
            .await?;

        info!(
            appointment_id = %appointment.id,
            organization_id = %organization_id,
            notes = appointment.notes.len(),
            "Appointment created"
        );
        log_index_failure(
            self.index.index_appointment(&appointment).await,
            appointment.id,
        );
        Ok(appointment)
    }

    pub async fn update(
        &self,
        identity: &IdentityContext,
        id: Uuid,
        update: UpdateAppointment,
    ) -> CrmResult<Appointment> {
        let mut appointment = self.load(identity, id).await?;
        let incoming = update.apply_to(&mut appointment.fields);

        validate_appointment(&appointment.fields)?;
        let plan = incoming
            .map(|notes| reconcile(&appointment.notes, notes))
            .transpose()?;

        let updated = self
            .appointments
            .update(&appointment, plan.as_ref())
            .await?;

        info!(appointment_id = %id, "Appointment updated");
        log_index_failure(self.index.index_appointment(&updated).await, id);
        Ok(updated)
    }

    pub async fn delete(&self, identity: &IdentityContext, id: Uuid) -> CrmResult<()> {
        self.load(identity, id).await?;
        self.appointments.delete(id).await?;
        info!(appointment_id = %id, "Appointment deleted");

        log_index_failure(self.index.remove_appointment(id).await, id);
        Ok(())
    }

    async fn contact_names(
        &self,
        appointments: &[Appointment],
    ) -> CrmResult<HashMap<Uuid, ContactName>> {
        let mut ids: Vec<Uuid> = appointments
            .iter()
            .filter_map(|a| a.fields.contact_uuid)
            .collect();
        ids.sort_unstable();
        ids.dedup();
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let contacts = self.contacts.get_many(&ids).await?;
        Ok(contacts
            .iter()
            .map(|contact| (contact.id, ContactName::from(contact)))
            .collect())
    }
}

fn denormalize(appointment: Appointment, names: &HashMap<Uuid, ContactName>) -> AppointmentView {
    let contact = appointment
        .fields
        .contact_uuid
        .and_then(|id| names.get(&id).cloned());
    AppointmentView::Denormalized(DenormalizedAppointment {
        appointment,
        contact,
    })
}

/// Resolve the appointment a dependent record (notification, driving
/// time) points at, as a validation error on `appointment` when it does
/// not exist and a denial when the caller may not see it.
pub(crate) async fn referenced_appointment<A: AppointmentRepository>(
    appointments: &A,
    identity: &IdentityContext,
    id: Uuid,
) -> CrmResult<Appointment> {
    let appointment = match appointments.get_by_id(id).await {
        Ok(appointment) => appointment,
        Err(CrmError::NotFound { .. }) => return Err(invalid_reference("appointment", id)),
        Err(e) => return Err(e),
    };
    authorize(identity, &appointment).into_result()?;
    Ok(appointment)
}
