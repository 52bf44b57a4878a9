//! Notification rendering and the send-once mail step.

use chrono::{DateTime, Utc};
use crm_core::models::appointment::Appointment;
use crm_core::models::contact::{ADDRESS_PREFERENCE, Contact};
use crm_core::models::notification::AppointmentNotification;
use tracing::{info, warn};

use crate::mailer::{Mailer, OutboundEmail};

const DATE_FORMAT: &str = "%d. %B %Y";
const TIME_FORMAT: &str = "%H:%M";
const SECONDS_PER_DAY: i64 = 86_400;

/// Where the appointment takes place: its own address when set, otherwise
/// the linked contact's address in order of [`ADDRESS_PREFERENCE`].
pub fn pick_address(appointment: &Appointment, contact: Option<&Contact>) -> Option<String> {
    let own = appointment.fields.address.trim();
    if !own.is_empty() {
        return Some(own.to_string());
    }
    let contact = contact?;
    ADDRESS_PREFERENCE
        .iter()
        .find_map(|kind| contact.fields.address_of_type(kind))
        .map(|address| address.formatted())
        .filter(|formatted| !formatted.is_empty())
}

/// Whole days from `now` until the appointment starts, rounded down.
pub fn days_until(appointment: &Appointment, now: DateTime<Utc>) -> i64 {
    (appointment.fields.start_date - now)
        .num_seconds()
        .div_euclid(SECONDS_PER_DAY)
}

/// The date line, with the end date appended for multi-day appointments.
pub fn date_line(appointment: &Appointment) -> String {
    let start = appointment.fields.start_date;
    let end = appointment.fields.end_date;
    let date = start.format(DATE_FORMAT).to_string();
    if (end - start).num_seconds() > SECONDS_PER_DAY {
        format!("{date} - {}", end.format(DATE_FORMAT))
    } else {
        date
    }
}

/// Render `(subject, message)` for a reminder about `appointment`.
///
/// `contact` is the appointment's linked contact, used only when the
/// appointment has no address of its own.
pub fn compose(
    notification: &AppointmentNotification,
    appointment: &Appointment,
    contact: Option<&Contact>,
    now: DateTime<Utc>,
) -> (String, String) {
    let days = days_until(appointment, now);
    let org_name = notification.org_name.as_deref().filter(|s| !s.is_empty());
    let org_phone = notification.org_phone.as_deref().filter(|s| !s.is_empty());

    let subject = match org_name {
        Some(org) => format!("Erinnerung an Ihren Termin in {days} Tagen bei {org}"),
        None => format!("Erinnerung an Ihren Termin in {days} Tagen"),
    };

    let mut message = String::from("Guten Tag,\n\n");
    message.push_str(&format!(
        "wir erinnern Sie an Ihren Termin am {} von {} bis {} Uhr.\n",
        date_line(appointment),
        appointment.fields.start_date.format(TIME_FORMAT),
        appointment.fields.end_date.format(TIME_FORMAT),
    ));
    if let Some(address) = pick_address(appointment, contact) {
        message.push_str(&format!("Adresse: {address}\n"));
    }
    if let Some(phone) = org_phone {
        message.push_str(&format!(
            "\nFalls Sie den Termin nicht wahrnehmen können, erreichen Sie uns unter {phone}.\n"
        ));
    }
    message.push_str("\nMit freundlichen Grüßen\n");
    if let Some(org) = org_name {
        message.push_str(org);
        message.push('\n');
    }

    (subject, message)
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// HTML alternative of a plain body: escaped, newlines as `<br>`.
pub fn html_alternative(body: &str) -> String {
    let html = escape_html(body).replace('\n', "<br>");
    format!(
        "<html><head><meta charset=\"UTF-8\"><title></title></head><body>{html}</body></html>"
    )
}

/// Mail `notification` unless it already went out, stamping `sent_at`.
///
/// Returns whether a mail was sent. A transport failure is logged and
/// leaves `sent_at` unset.
pub async fn send<M: Mailer>(
    mailer: &M,
    from: &str,
    notification: &mut AppointmentNotification,
    now: DateTime<Utc>,
) -> bool {
    if notification.sent_at.is_some() {
        warn!(
            appointment_id = %notification.appointment_id,
            "Notification not sent for appointment, message already sent"
        );
        return false;
    }

    let body = notification.message.clone().unwrap_or_default();
    let email = OutboundEmail {
        from: from.to_string(),
        to: notification.recipient.clone(),
        subject: notification.subject.clone().unwrap_or_default(),
        html_body: html_alternative(&body),
        body,
    };

    match mailer.send(email).await {
        Ok(()) => {
            notification.sent_at = Some(now);
            info!(
                appointment_id = %notification.appointment_id,
                "Notification sent for appointment"
            );
            true
        }
        Err(e) => {
            warn!(
                appointment_id = %notification.appointment_id,
                error = %e,
                "Notification mail failed"
            );
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};
    use crm_core::models::appointment::AppointmentFields;
    use crm_core::models::contact::{Address, ContactFields};
    use uuid::Uuid;

    use super::*;
    use crate::error::MailError;
    use crate::mailer::InMemoryMailer;

    fn appointment(start: DateTime<Utc>, end: DateTime<Utc>, address: &str) -> Appointment {
        Appointment {
            id: Uuid::new_v4(),
            owner: Uuid::new_v4(),
            organization_id: Uuid::new_v4(),
            fields: AppointmentFields {
                name: "Test Name".into(),
                start_date: start,
                end_date: end,
                types: vec!["Test Type".into()],
                address: address.into(),
                siteprofile_uuid: None,
                contact_uuid: None,
                invitee_uuids: vec![],
                workflowlevel2_uuids: vec![],
            },
            notes: vec![],
            created_at: start,
            updated_at: start,
        }
    }

    fn notification(sent_at: Option<DateTime<Utc>>) -> AppointmentNotification {
        AppointmentNotification {
            id: Uuid::new_v4(),
            appointment_id: Uuid::new_v4(),
            subject: Some("Test Mail".into()),
            message: Some("Test Body\n<b>bold</b>".into()),
            recipient: "test@example.com".into(),
            org_phone: Some("1234 56".into()),
            org_name: Some("Test org".into()),
            sent_at,
            send_notification: true,
        }
    }

    fn contact_with(addresses: Vec<Address>) -> Contact {
        Contact {
            id: Uuid::new_v4(),
            organization_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            fields: ContactFields {
                first_name: "Test".into(),
                addresses,
                ..Default::default()
            },
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn address(kind: &str, street: &str) -> Address {
        Address {
            kind: kind.into(),
            street: street.into(),
            city: "Berlin".into(),
            ..Default::default()
        }
    }

    #[test]
    fn message_carries_times_address_and_organization() {
        let start = Utc.with_ymd_and_hms(2018, 1, 1, 12, 15, 0).unwrap();
        let a = appointment(start, start + Duration::minutes(15), "Oderberger Straße 16A");
        let (subject, message) = compose(&notification(None), &a, None, start);

        assert!(subject.starts_with("Erinnerung an Ihren Termin in 0 Tagen"));
        assert!(message.contains("01. January 2018"));
        assert!(message.contains("12:15"));
        assert!(message.contains("12:30"));
        assert!(message.contains("Oderberger Straße 16A"));
        assert!(message.contains("1234 56"));
        assert!(message.contains("Test org"));
    }

    #[test]
    fn day_count_is_floored() {
        let now = Utc.with_ymd_and_hms(2018, 1, 1, 0, 0, 0).unwrap();
        let start = now + Duration::days(4) - Duration::seconds(5);
        let a = appointment(start, start + Duration::hours(2), "x");
        assert_eq!(days_until(&a, now), 3);

        let past = appointment(now - Duration::hours(1), now, "x");
        assert_eq!(days_until(&past, now), -1);
    }

    #[test]
    fn multi_day_appointment_shows_end_date() {
        let start = Utc.with_ymd_and_hms(2018, 1, 1, 9, 0, 0).unwrap();
        let a = appointment(start, start + Duration::days(2), "");
        assert_eq!(date_line(&a), "01. January 2018 - 03. January 2018");

        let same_day = appointment(start, start + Duration::hours(8), "");
        assert_eq!(date_line(&same_day), "01. January 2018");
    }

    #[test]
    fn address_falls_back_to_contact_by_preference() {
        let start = Utc::now();
        let a = appointment(start, start, "  ");
        let contact = contact_with(vec![
            address("billing", "Billing Road 1"),
            address("home", "Home Street 2"),
        ]);
        assert_eq!(
            pick_address(&a, Some(&contact)).as_deref(),
            Some("Home Street 2, Berlin")
        );

        let delivery = contact_with(vec![
            address("home", "Home Street 2"),
            address("delivery", "Dock 9"),
        ]);
        assert_eq!(
            pick_address(&a, Some(&delivery)).as_deref(),
            Some("Dock 9, Berlin")
        );

        assert_eq!(pick_address(&a, Some(&contact_with(vec![]))), None);
        assert_eq!(pick_address(&a, None), None);
    }

    #[test]
    fn html_alternative_escapes_and_breaks_lines() {
        let html = html_alternative("a < b\nc & d");
        assert!(html.contains("a &lt; b<br>c &amp; d"));
        assert!(html.starts_with("<html>"));
    }

    #[tokio::test]
    async fn send_mails_once_and_stamps_sent_at() {
        let mailer = InMemoryMailer::new();
        let now = Utc::now();
        let mut n = notification(None);

        assert!(send(&mailer, "noreply@example.org", &mut n, now).await);
        assert_eq!(n.sent_at, Some(now));
        let outbox = mailer.outbox();
        assert_eq!(outbox.len(), 1);
        assert_eq!(outbox[0].body, "Test Body\n<b>bold</b>");
        assert!(outbox[0].html_body.contains("Test Body<br>&lt;b&gt;bold&lt;/b&gt;"));

        assert!(!send(&mailer, "noreply@example.org", &mut n, now).await);
        assert_eq!(mailer.outbox().len(), 1);
    }

    struct BrokenMailer;

    impl Mailer for BrokenMailer {
        async fn send(&self, _email: OutboundEmail) -> Result<(), MailError> {
            Err(MailError::Transport("connection refused".into()))
        }
    }

    #[tokio::test]
    async fn failed_send_leaves_notification_unsent() {
        let mut n = notification(None);
        assert!(!send(&BrokenMailer, "noreply@example.org", &mut n, Utc::now()).await);
        assert!(n.sent_at.is_none());
    }
}
