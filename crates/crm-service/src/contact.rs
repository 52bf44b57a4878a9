//! Contact service: create, read, update, delete and list contacts.

use crm_core::error::{CrmError, CrmResult};
use crm_core::filter::{ContactQuery, QueryParams};
use crm_core::guard::authorize;
use crm_core::identity::IdentityContext;
use crm_core::models::contact::{Contact, ContactFields, CreateContact, UpdateContact};
use crm_core::pagination::{LimitOffset, LimitOffsetPage};
use crm_core::repository::{ContactRepository, ContactTypeRepository};
use crm_core::validation::validate_contact;
use tracing::info;
use uuid::Uuid;

use crate::error::invalid_reference;
use crate::index::{SearchIndex, log_index_failure};

/// First number handed out in an organization without customer ids.
pub const FIRST_CUSTOMER_ID: i64 = 10001;

pub const CUSTOMER_ID_EXHAUSTED_MESSAGE: &str =
    "No customer id left to assign automatically; set customer_id explicitly.";

pub struct ContactService<R: ContactRepository, T: ContactTypeRepository, I: SearchIndex> {
    contacts: R,
    types: T,
    index: I,
}

impl<R: ContactRepository, T: ContactTypeRepository, I: SearchIndex> ContactService<R, T, I> {
    pub fn new(contacts: R, types: T, index: I) -> Self {
        Self {
            contacts,
            types,
            index,
        }
    }

    pub async fn list(
        &self,
        identity: &IdentityContext,
        params: &QueryParams,
        base_url: &str,
    ) -> CrmResult<LimitOffsetPage<Contact>> {
        let query = ContactQuery::from_params(params, identity)?;
        let page = LimitOffset::from_params(params);
        let result = self
            .contacts
            .list(&query.filter, query.ordering, page.into())
            .await?;
        Ok(LimitOffsetPage::new(result.items, result.total, page, base_url))
    }

    pub async fn get(&self, identity: &IdentityContext, id: Uuid) -> CrmResult<Contact> {
        identity.require_authenticated()?;
        let contact = self.contacts.get_by_id(id).await?;
        authorize(identity, &contact).into_result()?;
        Ok(contact)
    }

    pub async fn create(
        &self,
        identity: &IdentityContext,
        mut fields: ContactFields,
    ) -> CrmResult<Contact> {
        let organization_id = identity.require_organization()?;
        let user_id = identity.require_user()?;

        validate_contact(&fields)?;
        self.check_contact_type(&fields, organization_id).await?;

        if fields.customer_id.is_none() {
            let next = match self.contacts.max_customer_id(organization_id).await? {
                None => FIRST_CUSTOMER_ID,
                Some(max) => max.checked_add(1).ok_or_else(|| {
                    CrmError::validation("customer_id", CUSTOMER_ID_EXHAUSTED_MESSAGE)
                })?,
            };
            fields.customer_id = Some(next);
        }

        let contact = self
            .contacts
            .create(CreateContact {
                organization_id,
                user_id,
                fields,
            })
            .await?;
        info!(
            contact_id = %contact.id,
            organization_id = %organization_id,
            customer_id = ?contact.fields.customer_id,
            "Contact created"
        );

        log_index_failure(self.index.index_contact(&contact).await, contact.id);
        Ok(contact)
    }

    pub async fn update(
        &self,
        identity: &IdentityContext,
        id: Uuid,
        update: UpdateContact,
    ) -> CrmResult<Contact> {
        let mut contact = self.get(identity, id).await?;
        update.apply_to(&mut contact.fields);

        validate_contact(&contact.fields)?;
        self.check_contact_type(&contact.fields, contact.organization_id)
            .await?;

        let contact = self.contacts.update(&contact).await?;
        info!(contact_id = %id, "Contact updated");

        log_index_failure(self.index.index_contact(&contact).await, contact.id);
        Ok(contact)
    }

    pub async fn delete(&self, identity: &IdentityContext, id: Uuid) -> CrmResult<()> {
        self.get(identity, id).await?;
        self.contacts.delete(id).await?;
        info!(contact_id = %id, "Contact deleted");

        log_index_failure(self.index.remove_contact(id).await, id);
        Ok(())
    }

    /// The referenced type must exist and be visible to the organization.
    async fn check_contact_type(
        &self,
        fields: &ContactFields,
        organization_id: Uuid,
    ) -> CrmResult<()> {
        let Some(type_id) = fields.contact_type else {
            return Ok(());
        };
        match self.types.get_by_id(type_id).await {
            Ok(contact_type) if contact_type.is_visible_to(organization_id) => Ok(()),
            Ok(_) | Err(CrmError::NotFound { .. }) => {
                Err(invalid_reference("contact_type", type_id))
            }
            Err(e) => Err(e),
        }
    }
}
