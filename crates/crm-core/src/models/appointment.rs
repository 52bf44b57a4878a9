//! Appointment domain model.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::contact::ContactName;
use super::double_option;
use super::note::{AppointmentNote, NoteInput};
use crate::filter::AppointmentSortField;
use crate::pagination::CursorKeyed;

/// The editable attributes of an appointment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppointmentFields {
    pub name: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    /// Free-text tags; at least one is required.
    #[serde(rename = "type")]
    pub types: Vec<String>,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub siteprofile_uuid: Option<Uuid>,
    #[serde(default)]
    pub contact_uuid: Option<Uuid>,
    /// Callers invited to the appointment.
    #[serde(default)]
    pub invitee_uuids: Vec<Uuid>,
    #[serde(default)]
    pub workflowlevel2_uuids: Vec<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    /// The caller that created the appointment.
    pub owner: Uuid,
    pub organization_id: Uuid,
    #[serde(flatten)]
    pub fields: AppointmentFields,
    pub notes: Vec<AppointmentNote>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    /// Value of the sort column a cursor records, `None` for id ordering.
    pub fn sort_key(&self, field: AppointmentSortField) -> Option<DateTime<Utc>> {
        match field {
            AppointmentSortField::Id => None,
            AppointmentSortField::StartDate => Some(self.fields.start_date),
            AppointmentSortField::EndDate => Some(self.fields.end_date),
        }
    }
}

impl CursorKeyed for Appointment {
    fn cursor_id(&self) -> Uuid {
        self.id
    }
}

impl fmt::Display for Appointment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.fields.name, self.fields.start_date)
    }
}

/// An appointment together with the name of its linked contact, as
/// returned when a client asks for `denormalize=true`.
#[derive(Debug, Clone, Serialize)]
pub struct DenormalizedAppointment {
    #[serde(flatten)]
    pub appointment: Appointment,
    pub contact: Option<ContactName>,
}

/// Client-supplied body for a new appointment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppointmentInput {
    #[serde(flatten)]
    pub fields: AppointmentFields,
    #[serde(default)]
    pub notes: Vec<NoteInput>,
}

/// Fields required to create a new appointment. Notes are stored
/// separately after the appointment row exists.
#[derive(Debug, Clone)]
pub struct CreateAppointment {
    pub owner: Uuid,
    pub organization_id: Uuid,
    pub fields: AppointmentFields,
}

/// Partial update of an appointment. Notes, when present, are merged by
/// type rather than replacing the existing set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateAppointment {
    pub name: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    #[serde(rename = "type")]
    pub types: Option<Vec<String>>,
    pub address: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub siteprofile_uuid: Option<Option<Uuid>>,
    #[serde(default, deserialize_with = "double_option")]
    pub contact_uuid: Option<Option<Uuid>>,
    pub invitee_uuids: Option<Vec<Uuid>>,
    pub workflowlevel2_uuids: Option<Vec<Uuid>>,
    pub notes: Option<Vec<NoteInput>>,
}

impl UpdateAppointment {
    /// Merge the scalar part of this update into `fields` and hand back
    /// the notes for reconciliation.
    pub fn apply_to(self, fields: &mut AppointmentFields) -> Option<Vec<NoteInput>> {
        if let Some(v) = self.name {
            fields.name = v;
        }
        if let Some(v) = self.start_date {
            fields.start_date = v;
        }
        if let Some(v) = self.end_date {
            fields.end_date = v;
        }
        if let Some(v) = self.types {
            fields.types = v;
        }
        if let Some(v) = self.address {
            fields.address = v;
        }
        if let Some(v) = self.siteprofile_uuid {
            fields.siteprofile_uuid = v;
        }
        if let Some(v) = self.contact_uuid {
            fields.contact_uuid = v;
        }
        if let Some(v) = self.invitee_uuids {
            fields.invitee_uuids = v;
        }
        if let Some(v) = self.workflowlevel2_uuids {
            fields.workflowlevel2_uuids = v;
        }
        self.notes
    }
}
