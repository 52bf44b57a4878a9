//! Contact type service.
//!
//! Global types are readable by every organization and writable only by
//! superusers.

use chrono::Utc;
use crm_core::error::{CrmError, CrmResult};
use crm_core::filter::{ContactTypeFilter, QueryParams};
use crm_core::guard::{GLOBAL_TYPE_READ_ONLY, authorize_type, authorize_type_write};
use crm_core::identity::IdentityContext;
use crm_core::models::contact_type::{
    ContactType, ContactTypeInput, CreateContactType, UpdateContactType,
};
use crm_core::repository::ContactTypeRepository;
use crm_core::validation::validate_contact_type;
use tracing::info;
use uuid::Uuid;

pub struct ContactTypeService<T: ContactTypeRepository> {
    types: T,
}

impl<T: ContactTypeRepository> ContactTypeService<T> {
    pub fn new(types: T) -> Self {
        Self { types }
    }

    pub async fn list(
        &self,
        identity: &IdentityContext,
        params: &QueryParams,
    ) -> CrmResult<Vec<ContactType>> {
        let filter = ContactTypeFilter::from_params(params, identity)?;
        self.types.list(&filter).await
    }

    pub async fn get(&self, identity: &IdentityContext, id: Uuid) -> CrmResult<ContactType> {
        identity.require_authenticated()?;
        let contact_type = self.types.get_by_id(id).await?;
        authorize_type(identity, &contact_type).into_result()?;
        Ok(contact_type)
    }

    pub async fn create(
        &self,
        identity: &IdentityContext,
        input: ContactTypeInput,
    ) -> CrmResult<ContactType> {
        let organization_id = identity.require_organization()?;
        if input.is_global && !identity.is_superuser {
            return Err(CrmError::denied(GLOBAL_TYPE_READ_ONLY));
        }

        // Validate before touching the store.
        let now = Utc::now();
        validate_contact_type(&ContactType {
            id: Uuid::nil(),
            name: input.name.clone(),
            organization_id,
            is_global: input.is_global,
            created_at: now,
            updated_at: now,
        })?;

        let contact_type = self
            .types
            .create(CreateContactType {
                organization_id,
                name: input.name,
                is_global: input.is_global,
            })
            .await?;
        info!(
            contact_type_id = %contact_type.id,
            organization_id = %organization_id,
            is_global = contact_type.is_global,
            "Contact type created"
        );
        Ok(contact_type)
    }

    pub async fn update(
        &self,
        identity: &IdentityContext,
        id: Uuid,
        update: UpdateContactType,
    ) -> CrmResult<ContactType> {
        identity.require_authenticated()?;
        let mut contact_type = self.types.get_by_id(id).await?;
        authorize_type_write(identity, &contact_type).into_result()?;

        update.apply_to(&mut contact_type);
        if contact_type.is_global && !identity.is_superuser {
            return Err(CrmError::denied(GLOBAL_TYPE_READ_ONLY));
        }
        validate_contact_type(&contact_type)?;

        let contact_type = self.types.update(&contact_type).await?;
        info!(contact_type_id = %id, "Contact type updated");
        Ok(contact_type)
    }

    pub async fn delete(&self, identity: &IdentityContext, id: Uuid) -> CrmResult<()> {
        identity.require_authenticated()?;
        let contact_type = self.types.get_by_id(id).await?;
        authorize_type_write(identity, &contact_type).into_result()?;

        self.types.delete(id).await?;
        info!(contact_type_id = %id, "Contact type deleted");
        Ok(())
    }
}
