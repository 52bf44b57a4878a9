//! CRM Service: Record services over the `crm-core` repository traits,
//! the notification composer and the mail and search-index collaborators.
//!
//! Services are generic over repository implementations so that this
//! crate has no dependency on the database crate.

pub mod appointment;
pub mod composer;
pub mod config;
pub mod contact;
pub mod contact_type;
pub mod driving_time;
pub mod error;
pub mod index;
pub mod mailer;
pub mod note;
pub mod notification;

pub use appointment::{AppointmentService, AppointmentView};
pub use config::ServiceConfig;
pub use contact::ContactService;
pub use contact_type::ContactTypeService;
pub use driving_time::DrivingTimeService;
pub use error::{IndexError, MailError};
pub use index::{LogIndex, NoopIndex, SearchIndex};
pub use mailer::{InMemoryMailer, LogMailer, Mailer, OutboundEmail};
pub use note::NoteService;
pub use notification::NotificationService;
