//! Shared application state: one instance of every record service over
//! the same database client.

use std::sync::Arc;

use crm_db::repository::{
    SurrealAppointmentNoteRepository, SurrealAppointmentRepository, SurrealContactRepository,
    SurrealContactTypeRepository, SurrealDrivingTimeRepository, SurrealNotificationRepository,
};
use crm_service::{
    AppointmentService, ContactService, ContactTypeService, DrivingTimeService, InMemoryMailer,
    LogIndex, LogMailer, MailError, Mailer, NoteService, NotificationService, OutboundEmail,
    ServiceConfig,
};
use surrealdb::Surreal;
use surrealdb::engine::any::Any;

use crate::config::MailerKind;

pub type Contacts =
    ContactService<SurrealContactRepository<Any>, SurrealContactTypeRepository<Any>, LogIndex>;
pub type ContactTypes = ContactTypeService<SurrealContactTypeRepository<Any>>;
pub type Appointments = AppointmentService<
    SurrealAppointmentRepository<Any>,
    SurrealContactRepository<Any>,
    LogIndex,
>;
pub type Notes =
    NoteService<SurrealAppointmentNoteRepository<Any>, SurrealAppointmentRepository<Any>>;
pub type Notifications = NotificationService<
    SurrealNotificationRepository<Any>,
    SurrealAppointmentRepository<Any>,
    SurrealContactRepository<Any>,
    ConfiguredMailer,
>;
pub type DrivingTimes =
    DrivingTimeService<SurrealDrivingTimeRepository<Any>, SurrealAppointmentRepository<Any>>;

/// The mail collaborator selected by configuration.
#[derive(Debug, Clone)]
pub enum ConfiguredMailer {
    Log(LogMailer),
    Memory(InMemoryMailer),
}

impl ConfiguredMailer {
    pub fn from_kind(kind: MailerKind) -> Self {
        match kind {
            MailerKind::Log => Self::Log(LogMailer),
            MailerKind::Memory => Self::Memory(InMemoryMailer::new()),
        }
    }
}

impl Mailer for ConfiguredMailer {
    async fn send(&self, email: OutboundEmail) -> Result<(), MailError> {
        match self {
            Self::Log(mailer) => mailer.send(email).await,
            Self::Memory(mailer) => mailer.send(email).await,
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub contacts: Arc<Contacts>,
    pub contact_types: Arc<ContactTypes>,
    pub appointments: Arc<Appointments>,
    pub notes: Arc<Notes>,
    pub notifications: Arc<Notifications>,
    pub driving_times: Arc<DrivingTimes>,
}

impl AppState {
    pub fn new(db: &Surreal<Any>, mailer: ConfiguredMailer, config: ServiceConfig) -> Self {
        let contacts = SurrealContactRepository::new(db.clone());
        let types = SurrealContactTypeRepository::new(db.clone());
        let appointments = SurrealAppointmentRepository::new(db.clone());
        let notes = SurrealAppointmentNoteRepository::new(db.clone());

        Self {
            contacts: Arc::new(ContactService::new(
                contacts.clone(),
                types.clone(),
                LogIndex,
            )),
            contact_types: Arc::new(ContactTypeService::new(types)),
            appointments: Arc::new(
                AppointmentService::new(appointments.clone(), contacts.clone(), LogIndex)
                    .with_cursor_config(config.appointment_pages),
            ),
            notes: Arc::new(NoteService::new(notes, appointments.clone())),
            notifications: Arc::new(NotificationService::new(
                SurrealNotificationRepository::new(db.clone()),
                appointments.clone(),
                contacts,
                mailer,
                config,
            )),
            driving_times: Arc::new(DrivingTimeService::new(
                SurrealDrivingTimeRepository::new(db.clone()),
                appointments,
            )),
        }
    }
}
