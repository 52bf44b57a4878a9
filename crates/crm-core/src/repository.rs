//! Repository trait definitions for data access abstraction.
//!
//! All repository operations are async. Single-record lookups are by id
//! only: organization checks happen in the access guard so that a missing
//! record and a foreign record can be told apart. List operations take a
//! filter carrying the organization scope.

use uuid::Uuid;

use crate::error::CrmResult;
use crate::filter::{
    AppointmentFilter, AppointmentSortField, ContactFilter, ContactSortField, ContactTypeFilter,
    Ordering,
};
use crate::models::{
    appointment::{Appointment, CreateAppointment},
    contact::{Contact, CreateContact},
    contact_type::{ContactType, CreateContactType},
    driving_time::{AppointmentDrivingTime, CreateDrivingTime},
    note::AppointmentNote,
    notification::{AppointmentNotification, CreateNotification},
};
use crate::notes::NotePlan;
use crate::pagination::CursorRequest;

/// Pagination parameters for list queries.
#[derive(Debug, Clone)]
pub struct Pagination {
    pub offset: u64,
    pub limit: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 50,
        }
    }
}

/// A paginated result set.
#[derive(Debug, Clone)]
pub struct PaginatedResult<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub offset: u64,
    pub limit: u64,
}

// ---------------------------------------------------------------------------
// Contacts
// ---------------------------------------------------------------------------

pub trait ContactRepository: Send + Sync {
    /// Insert a contact. `input.fields.customer_id` must already be set;
    /// a duplicate within the organization is a [`CrmError::Conflict`].
    ///
    /// [`CrmError::Conflict`]: crate::error::CrmError::Conflict
    fn create(&self, input: CreateContact) -> impl Future<Output = CrmResult<Contact>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = CrmResult<Contact>> + Send;
    /// Contacts with the given ids; unknown ids are skipped.
    fn get_many(&self, ids: &[Uuid]) -> impl Future<Output = CrmResult<Vec<Contact>>> + Send;
    /// Persist the full editable state of `contact`.
    fn update(&self, contact: &Contact) -> impl Future<Output = CrmResult<Contact>> + Send;
    fn delete(&self, id: Uuid) -> impl Future<Output = CrmResult<()>> + Send;
    fn list(
        &self,
        filter: &ContactFilter,
        ordering: Ordering<ContactSortField>,
        pagination: Pagination,
    ) -> impl Future<Output = CrmResult<PaginatedResult<Contact>>> + Send;
    /// Highest `customer_id` in use by the organization.
    fn max_customer_id(
        &self,
        organization_id: Uuid,
    ) -> impl Future<Output = CrmResult<Option<i64>>> + Send;
}

pub trait ContactTypeRepository: Send + Sync {
    fn create(
        &self,
        input: CreateContactType,
    ) -> impl Future<Output = CrmResult<ContactType>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = CrmResult<ContactType>> + Send;
    fn update(
        &self,
        contact_type: &ContactType,
    ) -> impl Future<Output = CrmResult<ContactType>> + Send;
    /// Delete a type and clear it from every contact referencing it.
    fn delete(&self, id: Uuid) -> impl Future<Output = CrmResult<()>> + Send;
    fn list(
        &self,
        filter: &ContactTypeFilter,
    ) -> impl Future<Output = CrmResult<Vec<ContactType>>> + Send;
}

// ---------------------------------------------------------------------------
// Appointments
// ---------------------------------------------------------------------------

pub trait AppointmentRepository: Send + Sync {
    /// Insert an appointment and create and link `notes`, all in one
    /// transaction.
    fn create(
        &self,
        input: CreateAppointment,
        notes: &[AppointmentNote],
    ) -> impl Future<Output = CrmResult<Appointment>> + Send;
    /// Load an appointment together with its notes.
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = CrmResult<Appointment>> + Send;
    /// Persist the editable fields of `appointment` and apply the note
    /// plan, if any, in one transaction. Without a plan the notes are
    /// untouched.
    fn update(
        &self,
        appointment: &Appointment,
        notes: Option<&NotePlan>,
    ) -> impl Future<Output = CrmResult<Appointment>> + Send;
    /// Delete an appointment, its notifications, driving times and note
    /// links in one transaction. The notes themselves stay.
    fn delete(&self, id: Uuid) -> impl Future<Output = CrmResult<()>> + Send;
    /// One window of a keyset-paginated listing.
    ///
    /// Returns at most `request.fetch_size()` rows strictly after the
    /// cursor, in walking order (descending through the list for a
    /// reverse cursor).
    fn list_page(
        &self,
        filter: &AppointmentFilter,
        ordering: Ordering<AppointmentSortField>,
        request: &CursorRequest,
    ) -> impl Future<Output = CrmResult<Vec<Appointment>>> + Send;
}

pub trait AppointmentNoteRepository: Send + Sync {
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = CrmResult<AppointmentNote>> + Send;
    fn update(
        &self,
        note: &AppointmentNote,
    ) -> impl Future<Output = CrmResult<AppointmentNote>> + Send;
    /// Delete a note and its appointment links.
    fn delete(&self, id: Uuid) -> impl Future<Output = CrmResult<()>> + Send;
    /// Notes of one appointment in link order.
    fn list_for_appointment(
        &self,
        appointment_id: Uuid,
    ) -> impl Future<Output = CrmResult<Vec<AppointmentNote>>> + Send;
    /// Appointments a note is linked to, oldest link first.
    fn parent_ids(&self, note_id: Uuid) -> impl Future<Output = CrmResult<Vec<Uuid>>> + Send;
    /// Notes linked to at least one appointment of the organization, or
    /// every note when `organization_id` is `None`.
    fn list(
        &self,
        organization_id: Option<Uuid>,
    ) -> impl Future<Output = CrmResult<Vec<AppointmentNote>>> + Send;
}

pub trait NotificationRepository: Send + Sync {
    fn create(
        &self,
        input: CreateNotification,
    ) -> impl Future<Output = CrmResult<AppointmentNotification>> + Send;
    fn get_by_id(
        &self,
        id: Uuid,
    ) -> impl Future<Output = CrmResult<AppointmentNotification>> + Send;
    fn update(
        &self,
        notification: &AppointmentNotification,
    ) -> impl Future<Output = CrmResult<AppointmentNotification>> + Send;
    fn delete(&self, id: Uuid) -> impl Future<Output = CrmResult<()>> + Send;
    /// Notifications whose appointment belongs to the organization.
    fn list(
        &self,
        organization_id: Option<Uuid>,
    ) -> impl Future<Output = CrmResult<Vec<AppointmentNotification>>> + Send;
}

pub trait DrivingTimeRepository: Send + Sync {
    fn create(
        &self,
        input: CreateDrivingTime,
    ) -> impl Future<Output = CrmResult<AppointmentDrivingTime>> + Send;
    fn get_by_id(
        &self,
        id: Uuid,
    ) -> impl Future<Output = CrmResult<AppointmentDrivingTime>> + Send;
    fn update(
        &self,
        driving_time: &AppointmentDrivingTime,
    ) -> impl Future<Output = CrmResult<AppointmentDrivingTime>> + Send;
    fn delete(&self, id: Uuid) -> impl Future<Output = CrmResult<()>> + Send;
    /// Driving times whose appointment belongs to the organization.
    fn list(
        &self,
        organization_id: Option<Uuid>,
    ) -> impl Future<Output = CrmResult<Vec<AppointmentDrivingTime>>> + Send;
}
