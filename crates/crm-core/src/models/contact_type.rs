//! Contact type domain model.
//!
//! Types classify contacts (customer, supplier, ...). A type is either
//! scoped to one organization or global, in which case every
//! organization can see it but only superusers can change it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactType {
    pub id: Uuid,
    pub name: String,
    /// The organization that created the type.
    pub organization_id: Uuid,
    pub is_global: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ContactType {
    /// Whether members of `organization_id` can see this type.
    pub fn is_visible_to(&self, organization_id: Uuid) -> bool {
        self.is_global || self.organization_id == organization_id
    }
}

/// Client-supplied fields for a new type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactTypeInput {
    pub name: String,
    #[serde(default)]
    pub is_global: bool,
}

#[derive(Debug, Clone)]
pub struct CreateContactType {
    pub organization_id: Uuid,
    pub name: String,
    pub is_global: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateContactType {
    pub name: Option<String>,
    pub is_global: Option<bool>,
}

impl UpdateContactType {
    pub fn apply_to(self, contact_type: &mut ContactType) {
        if let Some(name) = self.name {
            contact_type.name = name;
        }
        if let Some(is_global) = self.is_global {
            contact_type.is_global = is_global;
        }
    }
}
