//! Caller identity, read from claims an upstream collaborator already
//! verified.
//!
//! Every operation receives an [`IdentityContext`] explicitly; nothing
//! about the caller is stored in global or session state.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{CrmError, CrmResult};

/// The verified claims of the caller of a single request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityContext {
    pub organization_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    /// Display name of the caller.
    pub username: Option<String>,
    pub is_superuser: bool,
}

impl IdentityContext {
    /// An identity with no claims at all.
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// A regular member of `organization_id`.
    pub fn member(organization_id: Uuid, user_id: Uuid, username: impl Into<String>) -> Self {
        Self {
            organization_id: Some(organization_id),
            user_id: Some(user_id),
            username: Some(username.into()),
            is_superuser: false,
        }
    }

    pub fn superuser() -> Self {
        Self {
            is_superuser: true,
            ..Self::default()
        }
    }

    /// Superusers are always authenticated; everybody else needs both a
    /// caller id and a display name.
    pub fn is_authenticated(&self) -> bool {
        self.is_superuser || (self.user_id.is_some() && self.username.is_some())
    }

    /// Fails with [`CrmError::AuthenticationRequired`] for anonymous callers.
    pub fn require_authenticated(&self) -> CrmResult<()> {
        if self.is_authenticated() {
            Ok(())
        } else {
            Err(CrmError::AuthenticationRequired)
        }
    }

    /// The organization every write is stamped with.
    ///
    /// Writes need a concrete tenant, so a caller without an organization
    /// claim cannot create records even when otherwise authenticated.
    pub fn require_organization(&self) -> CrmResult<Uuid> {
        self.require_authenticated()?;
        self.organization_id.ok_or_else(|| {
            CrmError::denied("The caller does not belong to an organization.")
        })
    }

    /// The caller id every owned record is stamped with.
    pub fn require_user(&self) -> CrmResult<Uuid> {
        self.require_authenticated()?;
        self.user_id
            .ok_or_else(|| CrmError::denied("The caller has no user id."))
    }
}
