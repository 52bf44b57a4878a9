//! Eager validation of records before they reach the store.
//!
//! Every failure is a [`CrmError::Validation`] naming the request field
//! the client has to fix.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::error::{CrmError, CrmResult};
use crate::models::appointment::AppointmentFields;
use crate::models::contact::{
    ADDRESS_TYPES, Address, ContactFields, EMAIL_TYPES, Email, PHONE_TYPES, Phone,
};
use crate::models::contact_type::ContactType;
use crate::models::driving_time::AppointmentDrivingTime;
use crate::models::notification::AppointmentNotification;

/// Field name used for errors that concern more than one field.
pub const NON_FIELD_ERRORS: &str = "non_field_errors";

pub const EMPTY_TYPE_MESSAGE: &str = "type must be an array of one or more string elements";
pub const DATE_ORDER_MESSAGE: &str = "Start date cannot be later than end date.";
pub const INVALID_EMAIL_MESSAGE: &str = "Enter a valid email address.";

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^[a-z0-9!#$%&'*+/=?^_`{|}~-]+(\.[a-z0-9!#$%&'*+/=?^_`{|}~-]+)*@([a-z0-9]([a-z0-9-]{0,61}[a-z0-9])?\.)+[a-z0-9-]{2,63}$",
    )
    .expect("e-mail pattern is valid")
});

/// Whether `value` looks like a deliverable e-mail address.
pub fn is_valid_email(value: &str) -> bool {
    EMAIL_RE.is_match(value)
}

fn max_len(field: &str, value: &str, max: usize) -> CrmResult<()> {
    if value.chars().count() > max {
        return Err(CrmError::validation(
            field,
            format!("Ensure this field has no more than {max} characters."),
        ));
    }
    Ok(())
}

fn max_len_opt(field: &str, value: Option<&str>, max: usize) -> CrmResult<()> {
    value.map_or(Ok(()), |v| max_len(field, v, max))
}

fn not_blank(field: &str, value: &str) -> CrmResult<()> {
    if value.trim().is_empty() {
        return Err(CrmError::validation(field, "This field may not be blank."));
    }
    Ok(())
}

fn len_between(value: &str, min: usize, max: usize) -> bool {
    let len = value.chars().count();
    (min..=max).contains(&len)
}

fn invalid_entry<T: Serialize>(field: &str, value: &T, help: &str) -> CrmError {
    let rendered = serde_json::to_string(value).unwrap_or_default();
    CrmError::validation(field, format!("Invalid value: {rendered}. {help}"))
}

fn choices(list: &[&str]) -> String {
    list.join(", ")
}

// -----------------------------------------------------------------------
// Contact sub-records
// -----------------------------------------------------------------------

pub fn validate_addresses(addresses: &[Address]) -> CrmResult<()> {
    let help = format!(
        "List of 'address' objects with the structure: type (string - Choices: {}), \
         street (string), house_number (string), postal_code: (string), city (string), \
         country (string)",
        choices(ADDRESS_TYPES)
    );
    for address in addresses {
        let ok = ADDRESS_TYPES.contains(&address.kind.as_str())
            && len_between(&address.street, 0, 100)
            && len_between(&address.house_number, 0, 20)
            && len_between(&address.postal_code, 0, 20)
            && len_between(&address.city, 0, 85)
            && len_between(&address.country, 0, 50);
        if !ok {
            return Err(invalid_entry("addresses", address, &help));
        }
    }
    Ok(())
}

pub fn validate_phones(phones: &[Phone]) -> CrmResult<()> {
    let help = format!(
        "List of 'phone' objects with the structure: type (string - Choices: {}), \
         number (string)",
        choices(PHONE_TYPES)
    );
    for phone in phones {
        let ok = PHONE_TYPES.contains(&phone.kind.as_str()) && len_between(&phone.number, 3, 20);
        if !ok {
            return Err(invalid_entry("phones", phone, &help));
        }
    }
    Ok(())
}

pub fn validate_emails(emails: &[Email]) -> CrmResult<()> {
    let help = format!(
        "List of 'email' objects with the structure: type (string - Choices: {}), \
         email (string)",
        choices(EMAIL_TYPES)
    );
    for email in emails {
        let ok = EMAIL_TYPES.contains(&email.kind.as_str()) && len_between(&email.email, 3, 254);
        if !ok {
            return Err(invalid_entry("emails", email, &help));
        }
        if !is_valid_email(&email.email) {
            return Err(CrmError::validation("emails", INVALID_EMAIL_MESSAGE));
        }
    }
    Ok(())
}

// -----------------------------------------------------------------------
// Records
// -----------------------------------------------------------------------

pub fn validate_contact(fields: &ContactFields) -> CrmResult<()> {
    not_blank("first_name", &fields.first_name)?;
    max_len("first_name", &fields.first_name, 50)?;
    max_len_opt("middle_name", fields.middle_name.as_deref(), 50)?;
    max_len("last_name", &fields.last_name, 50)?;
    max_len_opt("suffix", fields.suffix.as_deref(), 50)?;
    max_len_opt("company", fields.company.as_deref(), 100)?;
    validate_addresses(&fields.addresses)?;
    validate_emails(&fields.emails)?;
    validate_phones(&fields.phones)?;
    Ok(())
}

pub fn validate_contact_type(contact_type: &ContactType) -> CrmResult<()> {
    not_blank("name", &contact_type.name)?;
    max_len("name", &contact_type.name, 255)
}

pub fn validate_appointment(fields: &AppointmentFields) -> CrmResult<()> {
    not_blank("name", &fields.name)?;
    max_len("name", &fields.name, 50)?;
    if fields.types.is_empty() {
        return Err(CrmError::validation("type", EMPTY_TYPE_MESSAGE));
    }
    for tag in &fields.types {
        max_len("type", tag, 50)?;
    }
    max_len("address", &fields.address, 100)?;
    if fields.start_date > fields.end_date {
        return Err(CrmError::validation(NON_FIELD_ERRORS, DATE_ORDER_MESSAGE));
    }
    Ok(())
}

pub fn validate_notification(notification: &AppointmentNotification) -> CrmResult<()> {
    max_len("recipient", &notification.recipient, 254)?;
    if !is_valid_email(&notification.recipient) {
        return Err(CrmError::validation("recipient", INVALID_EMAIL_MESSAGE));
    }
    max_len_opt("subject", notification.subject.as_deref(), 100)?;
    max_len_opt("org_phone", notification.org_phone.as_deref(), 20)?;
    max_len_opt("org_name", notification.org_name.as_deref(), 50)?;
    Ok(())
}

pub fn validate_driving_time(driving_time: &AppointmentDrivingTime) -> CrmResult<()> {
    if driving_time.distance.is_none() && driving_time.time.is_none() {
        return Err(CrmError::validation(
            NON_FIELD_ERRORS,
            "Either distance or time must be set.",
        ));
    }
    if driving_time.distance.is_some_and(|d| !d.is_finite() || d < 0.0) {
        return Err(CrmError::validation(
            "distance",
            "Ensure this value is greater than or equal to 0.",
        ));
    }
    if driving_time.time.is_some_and(|t| t < 0) {
        return Err(CrmError::validation(
            "time",
            "Ensure this value is greater than or equal to 0.",
        ));
    }
    Ok(())
}
