//! Per-record access decisions.
//!
//! Lists are scoped to the caller's organization up front through
//! [`list_scope`]; single-object operations ask [`authorize`] once the
//! record is loaded. A record that exists but may not be seen is always a
//! denial, never a not-found.

use uuid::Uuid;

use crate::error::{CrmError, CrmResult};
use crate::identity::IdentityContext;
use crate::models::appointment::Appointment;
use crate::models::contact::Contact;
use crate::models::contact_type::ContactType;

pub const AUTHENTICATION_REQUIRED: &str = "authentication required";
pub const FOREIGN_ORGANIZATION: &str = "User is not in the same organization as the object.";
pub const ORPHAN_NOTE: &str = "The note is not attached to any appointment.";
pub const GLOBAL_TYPE_READ_ONLY: &str = "Global types can only be changed by superusers.";

/// Outcome of an access check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Access {
    Allow,
    Deny(String),
}

impl Access {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Access::Allow)
    }

    /// Turn a denial into the matching [`CrmError`].
    pub fn into_result(self) -> CrmResult<()> {
        match self {
            Access::Allow => Ok(()),
            Access::Deny(reason) if reason == AUTHENTICATION_REQUIRED => {
                Err(CrmError::AuthenticationRequired)
            }
            Access::Deny(reason) => Err(CrmError::denied(reason)),
        }
    }
}

/// A record that belongs to an organization and possibly to a caller.
pub trait OrgScoped {
    fn organization_id(&self) -> Uuid;

    /// The caller that owns the record, if the record has one.
    fn owner_id(&self) -> Option<Uuid> {
        None
    }
}

impl OrgScoped for Contact {
    fn organization_id(&self) -> Uuid {
        self.organization_id
    }

    fn owner_id(&self) -> Option<Uuid> {
        Some(self.user_id)
    }
}

impl OrgScoped for Appointment {
    fn organization_id(&self) -> Uuid {
        self.organization_id
    }

    fn owner_id(&self) -> Option<Uuid> {
        Some(self.owner)
    }
}

impl OrgScoped for ContactType {
    fn organization_id(&self) -> Uuid {
        self.organization_id
    }
}

/// Decide whether `identity` may act on `record`.
///
/// Rules apply in order: superuser, anonymous, owner, organization.
pub fn authorize<R: OrgScoped + ?Sized>(identity: &IdentityContext, record: &R) -> Access {
    if identity.is_superuser {
        return Access::Allow;
    }
    if !identity.is_authenticated() {
        return Access::Deny(AUTHENTICATION_REQUIRED.to_string());
    }
    if let (Some(owner), Some(caller)) = (record.owner_id(), identity.user_id) {
        if owner == caller {
            return Access::Allow;
        }
    }
    if identity.organization_id == Some(record.organization_id()) {
        return Access::Allow;
    }
    Access::Deny(FOREIGN_ORGANIZATION.to_string())
}

/// Notes have no organization of their own; they are authorized through
/// the first appointment they are attached to.
pub fn authorize_note(identity: &IdentityContext, parents: &[Appointment]) -> Access {
    if identity.is_superuser {
        return Access::Allow;
    }
    match parents.first() {
        Some(appointment) => authorize(identity, appointment),
        None if !identity.is_authenticated() => Access::Deny(AUTHENTICATION_REQUIRED.to_string()),
        None => Access::Deny(ORPHAN_NOTE.to_string()),
    }
}

/// Reading a type only needs visibility; changing one additionally
/// requires that it is not global, unless the caller is a superuser.
pub fn authorize_type(identity: &IdentityContext, contact_type: &ContactType) -> Access {
    if identity.is_superuser {
        return Access::Allow;
    }
    if contact_type.is_global && identity.is_authenticated() {
        return Access::Allow;
    }
    authorize(identity, contact_type)
}

pub fn authorize_type_write(identity: &IdentityContext, contact_type: &ContactType) -> Access {
    if identity.is_superuser {
        return Access::Allow;
    }
    match authorize(identity, contact_type) {
        Access::Allow if contact_type.is_global => {
            Access::Deny(GLOBAL_TYPE_READ_ONLY.to_string())
        }
        Access::Deny(_) if contact_type.is_global && identity.is_authenticated() => {
            Access::Deny(GLOBAL_TYPE_READ_ONLY.to_string())
        }
        other => other,
    }
}

/// The organization a list request is restricted to.
///
/// Superusers without an organization claim see every organization.
pub fn list_scope(identity: &IdentityContext) -> CrmResult<Option<Uuid>> {
    identity.require_authenticated()?;
    match identity.organization_id {
        Some(org) => Ok(Some(org)),
        None if identity.is_superuser => Ok(None),
        None => Err(CrmError::denied(
            "The caller does not belong to an organization.",
        )),
    }
}
