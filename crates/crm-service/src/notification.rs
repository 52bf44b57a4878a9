//! Appointment notification service.
//!
//! Every write runs the same pipeline: validate, compose the subject and
//! message when the client left the message empty, mail the recipient
//! when asked to and not yet done, then persist.

use chrono::Utc;
use crm_core::error::{CrmError, CrmResult};
use crm_core::guard::{authorize, list_scope};
use crm_core::identity::IdentityContext;
use crm_core::models::appointment::Appointment;
use crm_core::models::contact::Contact;
use crm_core::models::notification::{
    AppointmentNotification, CreateNotification, NotificationInput, UpdateNotification,
};
use crm_core::repository::{AppointmentRepository, ContactRepository, NotificationRepository};
use crm_core::validation::validate_notification;
use tracing::info;
use uuid::Uuid;

use crate::appointment::referenced_appointment;
use crate::composer;
use crate::config::ServiceConfig;
use crate::mailer::Mailer;

pub struct NotificationService<R, A, C, M>
where
    R: NotificationRepository,
    A: AppointmentRepository,
    C: ContactRepository,
    M: Mailer,
{
    notifications: R,
    appointments: A,
    contacts: C,
    mailer: M,
    config: ServiceConfig,
}

impl<R, A, C, M> NotificationService<R, A, C, M>
where
    R: NotificationRepository,
    A: AppointmentRepository,
    C: ContactRepository,
    M: Mailer,
{
    pub fn new(
        notifications: R,
        appointments: A,
        contacts: C,
        mailer: M,
        config: ServiceConfig,
    ) -> Self {
        Self {
            notifications,
            appointments,
            contacts,
            mailer,
            config,
        }
    }

    pub async fn list(
        &self,
        identity: &IdentityContext,
    ) -> CrmResult<Vec<AppointmentNotification>> {
        let scope = list_scope(identity)?;
        self.notifications.list(scope).await
    }

    pub async fn get(
        &self,
        identity: &IdentityContext,
        id: Uuid,
    ) -> CrmResult<AppointmentNotification> {
        self.load(identity, id).await.map(|(notification, _)| notification)
    }

    pub async fn create(
        &self,
        identity: &IdentityContext,
        input: NotificationInput,
    ) -> CrmResult<AppointmentNotification> {
        identity.require_authenticated()?;
        let appointment =
            referenced_appointment(&self.appointments, identity, input.appointment_id).await?;

        // The id is assigned on insert.
        let mut notification = AppointmentNotification {
            id: Uuid::nil(),
            appointment_id: input.appointment_id,
            subject: input.subject,
            message: input.message,
            recipient: input.recipient,
            org_phone: input.org_phone,
            org_name: input.org_name,
            sent_at: None,
            send_notification: input.send_notification,
        };
        self.prepare(&mut notification, &appointment).await?;

        let created = self
            .notifications
            .create(CreateNotification {
                appointment_id: notification.appointment_id,
                subject: notification.subject,
                message: notification.message,
                recipient: notification.recipient,
                org_phone: notification.org_phone,
                org_name: notification.org_name,
                sent_at: notification.sent_at,
                send_notification: notification.send_notification,
            })
            .await?;
        info!(
            notification_id = %created.id,
            appointment_id = %created.appointment_id,
            sent = created.sent_at.is_some(),
            "Notification created"
        );
        Ok(created)
    }

    pub async fn update(
        &self,
        identity: &IdentityContext,
        id: Uuid,
        update: UpdateNotification,
    ) -> CrmResult<AppointmentNotification> {
        let (mut notification, mut appointment) = self.load(identity, id).await?;
        update.apply_to(&mut notification);

        if notification.appointment_id != appointment.id {
            appointment =
                referenced_appointment(&self.appointments, identity, notification.appointment_id)
                    .await?;
        }
        self.prepare(&mut notification, &appointment).await?;

        let updated = self.notifications.update(&notification).await?;
        info!(
            notification_id = %id,
            sent = updated.sent_at.is_some(),
            "Notification updated"
        );
        Ok(updated)
    }

    pub async fn delete(&self, identity: &IdentityContext, id: Uuid) -> CrmResult<()> {
        self.load(identity, id).await?;
        self.notifications.delete(id).await?;
        info!(notification_id = %id, "Notification deleted");
        Ok(())
    }

    /// Validate, compose and send, in that order. A failed mail leaves
    /// the notification unsent but does not fail the write.
    async fn prepare(
        &self,
        notification: &mut AppointmentNotification,
        appointment: &Appointment,
    ) -> CrmResult<()> {
        validate_notification(notification)?;
        let now = Utc::now();

        if !notification.has_message() {
            let contact = self.linked_contact(appointment).await?;
            let (subject, message) =
                composer::compose(notification, appointment, contact.as_ref(), now);
            notification.subject = Some(subject);
            notification.message = Some(message);
        }

        if notification.send_notification && notification.sent_at.is_none() {
            composer::send(&self.mailer, &self.config.mail_from, notification, now).await;
        }
        Ok(())
    }

    /// The contact whose address stands in for a blank appointment address.
    async fn linked_contact(&self, appointment: &Appointment) -> CrmResult<Option<Contact>> {
        if !appointment.fields.address.trim().is_empty() {
            return Ok(None);
        }
        let Some(contact_id) = appointment.fields.contact_uuid else {
            return Ok(None);
        };
        match self.contacts.get_by_id(contact_id).await {
            Ok(contact) => Ok(Some(contact)),
            Err(CrmError::NotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn load(
        &self,
        identity: &IdentityContext,
        id: Uuid,
    ) -> CrmResult<(AppointmentNotification, Appointment)> {
        identity.require_authenticated()?;
        let notification = self.notifications.get_by_id(id).await?;
        let appointment = self
            .appointments
            .get_by_id(notification.appointment_id)
            .await?;
        authorize(identity, &appointment).into_result()?;
        Ok((notification, appointment))
    }
}
