//! Contact domain model.
//!
//! A contact is a person or company an organization deals with. Contacts
//! carry free-form lists of addresses, phone numbers and e-mail addresses,
//! each a small record tagged by an enumerated `type`.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::double_option;

/// Allowed values of [`Address::kind`].
pub const ADDRESS_TYPES: &[&str] = &["home", "billing", "business", "delivery", "mailing"];

/// Allowed values of [`Phone::kind`].
pub const PHONE_TYPES: &[&str] = &["office", "mobile", "home", "fax"];

/// Allowed values of [`Email::kind`].
pub const EMAIL_TYPES: &[&str] = &["office", "private", "other"];

/// Preference order when an address has to be picked for a notification.
pub const ADDRESS_PREFERENCE: &[&str] = &["delivery", "home", "business", "billing", "mailing"];

/// Salutation of a contact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Title {
    Mr,
    Ms,
    Mrs,
    Miss,
    Family,
}

impl Title {
    pub fn as_str(&self) -> &'static str {
        match self {
            Title::Mr => "mr",
            Title::Ms => "ms",
            Title::Mrs => "mrs",
            Title::Miss => "miss",
            Title::Family => "family",
        }
    }
}

impl FromStr for Title {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mr" => Ok(Title::Mr),
            "ms" => Ok(Title::Ms),
            "mrs" => Ok(Title::Mrs),
            "miss" => Ok(Title::Miss),
            "family" => Ok(Title::Family),
            other => Err(format!("unknown title: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CustomerType {
    Customer,
    Company,
    Public,
}

impl CustomerType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CustomerType::Customer => "customer",
            CustomerType::Company => "company",
            CustomerType::Public => "public",
        }
    }
}

impl FromStr for CustomerType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "customer" => Ok(CustomerType::Customer),
            "company" => Ok(CustomerType::Company),
            "public" => Ok(CustomerType::Public),
            other => Err(format!("unknown customer type: {other}")),
        }
    }
}

/// A postal address. `kind` must be one of [`ADDRESS_TYPES`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub street: String,
    #[serde(default)]
    pub house_number: String,
    #[serde(default)]
    pub postal_code: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub country: String,
}

impl Address {
    /// Single-line rendering, e.g. `Oderberger Straße 16A, 10435 Berlin, Germany`.
    pub fn formatted(&self) -> String {
        let street = join_non_empty(&[&self.street, &self.house_number], " ");
        let city = join_non_empty(&[&self.postal_code, &self.city], " ");
        join_non_empty(&[&street, &city, &self.country], ", ")
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.formatted())
    }
}

fn join_non_empty(parts: &[&str], sep: &str) -> String {
    parts
        .iter()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(sep)
}

/// A phone number. `kind` must be one of [`PHONE_TYPES`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Phone {
    #[serde(rename = "type")]
    pub kind: String,
    pub number: String,
}

/// An e-mail address. `kind` must be one of [`EMAIL_TYPES`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Email {
    #[serde(rename = "type")]
    pub kind: String,
    pub email: String,
}

/// The editable attributes of a contact.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContactFields {
    pub first_name: String,
    #[serde(default)]
    pub middle_name: Option<String>,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub title: Option<Title>,
    #[serde(default)]
    pub suffix: Option<String>,
    /// Reference to a [`ContactType`](super::contact_type::ContactType).
    #[serde(default)]
    pub contact_type: Option<Uuid>,
    #[serde(default)]
    pub customer_type: Option<CustomerType>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub addresses: Vec<Address>,
    #[serde(default)]
    pub siteprofile_uuids: Vec<Uuid>,
    #[serde(default)]
    pub emails: Vec<Email>,
    #[serde(default)]
    pub phones: Vec<Phone>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub workflowlevel1_uuids: Vec<Uuid>,
    #[serde(default)]
    pub workflowlevel2_uuids: Vec<Uuid>,
    /// Organization-unique number; assigned on create when absent.
    #[serde(default)]
    pub customer_id: Option<i64>,
}

impl ContactFields {
    /// Addresses keyed by type, first one of each type wins.
    pub fn address_of_type(&self, kind: &str) -> Option<&Address> {
        self.addresses.iter().find(|a| a.kind == kind)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    pub id: Uuid,
    pub organization_id: Uuid,
    /// The caller that created the contact.
    pub user_id: Uuid,
    #[serde(flatten)]
    pub fields: ContactFields,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl fmt::Display for Contact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.fields.first_name, self.fields.last_name)
    }
}

/// Name-only projection embedded into denormalized appointments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactName {
    pub uuid: Uuid,
    pub first_name: String,
    pub middle_name: Option<String>,
    pub last_name: String,
}

impl From<&Contact> for ContactName {
    fn from(contact: &Contact) -> Self {
        Self {
            uuid: contact.id,
            first_name: contact.fields.first_name.clone(),
            middle_name: contact.fields.middle_name.clone(),
            last_name: contact.fields.last_name.clone(),
        }
    }
}

/// Fields required to create a new contact.
///
/// `organization_id` and `user_id` come from the caller's identity and
/// `fields.customer_id` is already resolved.
#[derive(Debug, Clone)]
pub struct CreateContact {
    pub organization_id: Uuid,
    pub user_id: Uuid,
    pub fields: ContactFields,
}

/// Partial update of a contact. Absent keys are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateContact {
    pub first_name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub middle_name: Option<Option<String>>,
    pub last_name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub title: Option<Option<Title>>,
    #[serde(default, deserialize_with = "double_option")]
    pub suffix: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub contact_type: Option<Option<Uuid>>,
    #[serde(default, deserialize_with = "double_option")]
    pub customer_type: Option<Option<CustomerType>>,
    #[serde(default, deserialize_with = "double_option")]
    pub company: Option<Option<String>>,
    pub addresses: Option<Vec<Address>>,
    pub siteprofile_uuids: Option<Vec<Uuid>>,
    pub emails: Option<Vec<Email>>,
    pub phones: Option<Vec<Phone>>,
    #[serde(default, deserialize_with = "double_option")]
    pub notes: Option<Option<String>>,
    pub workflowlevel1_uuids: Option<Vec<Uuid>>,
    pub workflowlevel2_uuids: Option<Vec<Uuid>>,
    pub customer_id: Option<i64>,
}

impl UpdateContact {
    /// Merge this update into `fields`.
    pub fn apply_to(self, fields: &mut ContactFields) {
        if let Some(v) = self.first_name {
            fields.first_name = v;
        }
        if let Some(v) = self.middle_name {
            fields.middle_name = v;
        }
        if let Some(v) = self.last_name {
            fields.last_name = v;
        }
        if let Some(v) = self.title {
            fields.title = v;
        }
        if let Some(v) = self.suffix {
            fields.suffix = v;
        }
        if let Some(v) = self.contact_type {
            fields.contact_type = v;
        }
        if let Some(v) = self.customer_type {
            fields.customer_type = v;
        }
        if let Some(v) = self.company {
            fields.company = v;
        }
        if let Some(v) = self.addresses {
            fields.addresses = v;
        }
        if let Some(v) = self.siteprofile_uuids {
            fields.siteprofile_uuids = v;
        }
        if let Some(v) = self.emails {
            fields.emails = v;
        }
        if let Some(v) = self.phones {
            fields.phones = v;
        }
        if let Some(v) = self.notes {
            fields.notes = v;
        }
        if let Some(v) = self.workflowlevel1_uuids {
            fields.workflowlevel1_uuids = v;
        }
        if let Some(v) = self.workflowlevel2_uuids {
            fields.workflowlevel2_uuids = v;
        }
        if let Some(v) = self.customer_id {
            fields.customer_id = Some(v);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_formatting_skips_blank_parts() {
        let address = Address {
            kind: "home".into(),
            street: "Oderberger Straße".into(),
            house_number: "16A".into(),
            postal_code: "10435".into(),
            city: "Berlin".into(),
            country: String::new(),
        };
        assert_eq!(address.formatted(), "Oderberger Straße 16A, 10435 Berlin");
    }

    #[test]
    fn update_distinguishes_null_from_absent() {
        let mut fields = ContactFields {
            first_name: "David".into(),
            middle_name: Some("Robert".into()),
            company: Some("RCA".into()),
            ..Default::default()
        };
        let update: UpdateContact =
            serde_json::from_str(r#"{"middle_name": null, "last_name": ""}"#).unwrap();
        update.apply_to(&mut fields);

        assert_eq!(fields.middle_name, None);
        assert_eq!(fields.last_name, "");
        assert_eq!(fields.company.as_deref(), Some("RCA"));
    }

    #[test]
    fn contact_serializes_flat() {
        let contact = Contact {
            id: Uuid::new_v4(),
            organization_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            fields: ContactFields {
                first_name: "Nina".into(),
                last_name: "Simone".into(),
                title: Some(Title::Ms),
                ..Default::default()
            },
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let json = serde_json::to_value(&contact).unwrap();
        assert_eq!(json["first_name"], "Nina");
        assert_eq!(json["title"], "ms");
        assert!(json.get("fields").is_none());
    }
}
