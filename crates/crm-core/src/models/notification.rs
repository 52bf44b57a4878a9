//! Appointment notification domain model.
//!
//! A notification is an e-mail reminder about an appointment. Subject and
//! message are generated when the client leaves them empty; `sent_at` is
//! stamped once when the mail goes out and never cleared.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::double_option;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppointmentNotification {
    pub id: Uuid,
    #[serde(rename = "appointment")]
    pub appointment_id: Uuid,
    pub subject: Option<String>,
    pub message: Option<String>,
    pub recipient: String,
    pub org_phone: Option<String>,
    pub org_name: Option<String>,
    pub sent_at: Option<DateTime<Utc>>,
    pub send_notification: bool,
}

impl AppointmentNotification {
    pub fn has_message(&self) -> bool {
        self.message.as_deref().is_some_and(|m| !m.is_empty())
    }
}

/// Client-supplied body for a new notification. `sent_at` is read-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationInput {
    #[serde(rename = "appointment")]
    pub appointment_id: Uuid,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    pub recipient: String,
    #[serde(default)]
    pub org_phone: Option<String>,
    #[serde(default)]
    pub org_name: Option<String>,
    #[serde(default)]
    pub send_notification: bool,
}

/// A notification that passed the pre-save pipeline and is ready to be
/// inserted.
#[derive(Debug, Clone)]
pub struct CreateNotification {
    pub appointment_id: Uuid,
    pub subject: Option<String>,
    pub message: Option<String>,
    pub recipient: String,
    pub org_phone: Option<String>,
    pub org_name: Option<String>,
    pub sent_at: Option<DateTime<Utc>>,
    pub send_notification: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateNotification {
    #[serde(rename = "appointment")]
    pub appointment_id: Option<Uuid>,
    #[serde(default, deserialize_with = "double_option")]
    pub subject: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub message: Option<Option<String>>,
    pub recipient: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub org_phone: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub org_name: Option<Option<String>>,
    pub send_notification: Option<bool>,
}

impl UpdateNotification {
    pub fn apply_to(self, notification: &mut AppointmentNotification) {
        if let Some(v) = self.appointment_id {
            notification.appointment_id = v;
        }
        if let Some(v) = self.subject {
            notification.subject = v;
        }
        if let Some(v) = self.message {
            notification.message = v;
        }
        if let Some(v) = self.recipient {
            notification.recipient = v;
        }
        if let Some(v) = self.org_phone {
            notification.org_phone = v;
        }
        if let Some(v) = self.org_name {
            notification.org_name = v;
        }
        if let Some(v) = self.send_notification {
            notification.send_notification = v;
        }
    }
}
