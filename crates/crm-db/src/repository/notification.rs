//! SurrealDB implementation of [`NotificationRepository`].

use chrono::{DateTime, Utc};
use crm_core::error::CrmResult;
use crm_core::models::notification::{AppointmentNotification, CreateNotification};
use crm_core::repository::NotificationRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::debug;
use uuid::Uuid;

use super::parse_uuid;
use crate::error::DbError;

const SELECT_NOTIFICATION: &str = "SELECT meta::id(id) AS record_id, * FROM";

#[derive(Debug, SurrealValue)]
struct NotificationRow {
    record_id: String,
    appointment_id: String,
    subject: Option<String>,
    message: Option<String>,
    recipient: String,
    org_phone: Option<String>,
    org_name: Option<String>,
    sent_at: Option<DateTime<Utc>>,
    send_notification: bool,
}

impl NotificationRow {
    fn try_into_notification(self) -> Result<AppointmentNotification, DbError> {
        Ok(AppointmentNotification {
            id: parse_uuid(&self.record_id, "notification")?,
            appointment_id: parse_uuid(&self.appointment_id, "appointment")?,
            subject: self.subject,
            message: self.message,
            recipient: self.recipient,
            org_phone: self.org_phone,
            org_name: self.org_name,
            sent_at: self.sent_at,
            send_notification: self.send_notification,
        })
    }
}

/// SurrealDB implementation of the AppointmentNotification repository.
#[derive(Clone)]
pub struct SurrealNotificationRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealNotificationRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    #[allow(clippy::too_many_arguments)]
    async fn write(
        &self,
        statement: &str,
        id: Uuid,
        appointment_id: Uuid,
        subject: Option<String>,
        message: Option<String>,
        recipient: String,
        org_phone: Option<String>,
        org_name: Option<String>,
        sent_at: Option<DateTime<Utc>>,
        send_notification: bool,
    ) -> Result<AppointmentNotification, DbError> {
        let id_str = id.to_string();
        let query = format!(
            "{statement} type::record('appointment_notification', $id) SET \
             appointment_id = $appointment_id, subject = $subject, \
             message = $message, recipient = $recipient, \
             org_phone = $org_phone, org_name = $org_name, \
             sent_at = $sent_at, send_notification = $send_notification; \
             {SELECT_NOTIFICATION} type::record('appointment_notification', $id);"
        );

        let result = self
            .db
            .query(query)
            .bind(("id", id_str.clone()))
            .bind(("appointment_id", appointment_id.to_string()))
            .bind(("subject", subject))
            .bind(("message", message))
            .bind(("recipient", recipient))
            .bind(("org_phone", org_phone))
            .bind(("org_name", org_name))
            .bind(("sent_at", sent_at))
            .bind(("send_notification", send_notification))
            .await?;

        let mut result = result.check().map_err(DbError::from_statement)?;
        let rows: Vec<NotificationRow> = result.take(1)?;
        rows.into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("appointment_notification", id_str))?
            .try_into_notification()
    }
}

impl<C: Connection> NotificationRepository for SurrealNotificationRepository<C> {
    async fn create(&self, input: CreateNotification) -> CrmResult<AppointmentNotification> {
        let id = Uuid::new_v4();
        let notification = self
            .write(
                "CREATE",
                id,
                input.appointment_id,
                input.subject,
                input.message,
                input.recipient,
                input.org_phone,
                input.org_name,
                input.sent_at,
                input.send_notification,
            )
            .await?;
        debug!(
            notification_id = %id,
            appointment_id = %notification.appointment_id,
            sent = notification.sent_at.is_some(),
            "Notification created"
        );
        Ok(notification)
    }

    async fn get_by_id(&self, id: Uuid) -> CrmResult<AppointmentNotification> {
        let id_str = id.to_string();
        let mut result = self
            .db
            .query(format!(
                "{SELECT_NOTIFICATION} type::record('appointment_notification', $id)"
            ))
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<NotificationRow> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("appointment_notification", id_str))?;
        Ok(row.try_into_notification()?)
    }

    async fn update(
        &self,
        notification: &AppointmentNotification,
    ) -> CrmResult<AppointmentNotification> {
        let n = notification.clone();
        Ok(self
            .write(
                "UPDATE",
                n.id,
                n.appointment_id,
                n.subject,
                n.message,
                n.recipient,
                n.org_phone,
                n.org_name,
                n.sent_at,
                n.send_notification,
            )
            .await?)
    }

    async fn delete(&self, id: Uuid) -> CrmResult<()> {
        self.db
            .query("DELETE type::record('appointment_notification', $id)")
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::from_statement)?;
        Ok(())
    }

    async fn list(&self, organization_id: Option<Uuid>) -> CrmResult<Vec<AppointmentNotification>> {
        let where_sql = if organization_id.is_some() {
            "WHERE appointment_id IN (\
                 SELECT VALUE meta::id(id) FROM appointment \
                 WHERE organization_id = $organization_id\
             )"
        } else {
            ""
        };

        let mut result = self
            .db
            .query(format!(
                "{SELECT_NOTIFICATION} appointment_notification {where_sql} ORDER BY id ASC"
            ))
            .bind(("organization_id", organization_id.map(|u| u.to_string())))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<NotificationRow> = result.take(0).map_err(DbError::from)?;
        let notifications = rows
            .into_iter()
            .map(|row| row.try_into_notification())
            .collect::<Result<Vec<_>, DbError>>()?;
        Ok(notifications)
    }
}
