//! SurrealDB implementation of [`ContactRepository`].

use chrono::{DateTime, Utc};
use crm_core::error::CrmResult;
use crm_core::filter::{ContactFilter, ContactSortField, Ordering, SortField};
use crm_core::models::contact::{
    Address, Contact, ContactFields, CreateContact, CustomerType, Email, Phone, Title,
};
use crm_core::repository::{ContactRepository, PaginatedResult, Pagination};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::debug;
use uuid::Uuid;

use super::{CountRow, parse_opt_uuid, parse_uuid, parse_uuids, uuid_strings, where_clause};
use crate::error::DbError;

const SELECT_CONTACT: &str = "SELECT meta::id(id) AS record_id, * FROM";

/// DB-side row struct that includes the record ID via `meta::id(id)`.
#[derive(Debug, SurrealValue)]
struct ContactRow {
    record_id: String,
    organization_id: String,
    user_id: String,
    first_name: String,
    middle_name: Option<String>,
    last_name: String,
    title: Option<String>,
    suffix: Option<String>,
    contact_type: Option<String>,
    customer_type: Option<String>,
    company: Option<String>,
    addresses: serde_json::Value,
    emails: serde_json::Value,
    phones: serde_json::Value,
    siteprofile_uuids: Vec<String>,
    workflowlevel1_uuids: Vec<String>,
    workflowlevel2_uuids: Vec<String>,
    notes: Option<String>,
    customer_id: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct CustomerIdRow {
    customer_id: i64,
}

fn decode_list<T: serde::de::DeserializeOwned>(
    value: serde_json::Value,
    what: &str,
) -> Result<Vec<T>, DbError> {
    if value.is_null() {
        return Ok(Vec::new());
    }
    serde_json::from_value(value).map_err(|e| DbError::Decode(format!("invalid {what}: {e}")))
}

fn encode_list<T: serde::Serialize>(items: &[T]) -> Result<serde_json::Value, DbError> {
    serde_json::to_value(items).map_err(|e| DbError::Decode(e.to_string()))
}

impl ContactRow {
    fn try_into_contact(self) -> Result<Contact, DbError> {
        let title = self
            .title
            .map(|t| t.parse::<Title>())
            .transpose()
            .map_err(DbError::Decode)?;
        let customer_type = self
            .customer_type
            .map(|t| t.parse::<CustomerType>())
            .transpose()
            .map_err(DbError::Decode)?;
        Ok(Contact {
            id: parse_uuid(&self.record_id, "contact")?,
            organization_id: parse_uuid(&self.organization_id, "organization")?,
            user_id: parse_uuid(&self.user_id, "user")?,
            fields: ContactFields {
                first_name: self.first_name,
                middle_name: self.middle_name,
                last_name: self.last_name,
                title,
                suffix: self.suffix,
                contact_type: parse_opt_uuid(self.contact_type, "contact type")?,
                customer_type,
                company: self.company,
                addresses: decode_list::<Address>(self.addresses, "addresses")?,
                siteprofile_uuids: parse_uuids(self.siteprofile_uuids, "siteprofile")?,
                emails: decode_list::<Email>(self.emails, "emails")?,
                phones: decode_list::<Phone>(self.phones, "phones")?,
                notes: self.notes,
                workflowlevel1_uuids: parse_uuids(self.workflowlevel1_uuids, "workflowlevel1")?,
                workflowlevel2_uuids: parse_uuids(self.workflowlevel2_uuids, "workflowlevel2")?,
                customer_id: Some(self.customer_id),
            },
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// SurrealDB implementation of the Contact repository.
#[derive(Clone)]
pub struct SurrealContactRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealContactRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    /// Write every editable field onto `contact:$id` with `statement`
    /// (`CREATE` or `UPDATE`) and read the row back.
    async fn write(
        &self,
        statement: &str,
        id: Uuid,
        organization_id: Option<Uuid>,
        user_id: Option<Uuid>,
        fields: &ContactFields,
    ) -> Result<Contact, DbError> {
        let id_str = id.to_string();
        let customer_id = fields
            .customer_id
            .ok_or_else(|| DbError::Decode("contact without customer_id".into()))?;

        let mut sets = vec![
            "first_name = $first_name",
            "middle_name = $middle_name",
            "last_name = $last_name",
            "title = $title",
            "suffix = $suffix",
            "contact_type = $contact_type",
            "customer_type = $customer_type",
            "company = $company",
            "addresses = $addresses",
            "emails = $emails",
            "phones = $phones",
            "siteprofile_uuids = $siteprofile_uuids",
            "workflowlevel1_uuids = $workflowlevel1_uuids",
            "workflowlevel2_uuids = $workflowlevel2_uuids",
            "notes = $notes",
            "customer_id = $customer_id",
            "updated_at = time::now()",
        ];
        if organization_id.is_some() {
            sets.push("organization_id = $organization_id");
        }
        if user_id.is_some() {
            sets.push("user_id = $user_id");
        }

        let query = format!(
            "{statement} type::record('contact', $id) SET {}; \
             {SELECT_CONTACT} type::record('contact', $id);",
            sets.join(", ")
        );

        let result = self
            .db
            .query(query)
            .bind(("id", id_str.clone()))
            .bind(("organization_id", organization_id.map(|u| u.to_string())))
            .bind(("user_id", user_id.map(|u| u.to_string())))
            .bind(("first_name", fields.first_name.clone()))
            .bind(("middle_name", fields.middle_name.clone()))
            .bind(("last_name", fields.last_name.clone()))
            .bind(("title", fields.title.map(|t| t.as_str().to_string())))
            .bind(("suffix", fields.suffix.clone()))
            .bind(("contact_type", fields.contact_type.map(|u| u.to_string())))
            .bind((
                "customer_type",
                fields.customer_type.map(|t| t.as_str().to_string()),
            ))
            .bind(("company", fields.company.clone()))
            .bind(("addresses", encode_list(&fields.addresses)?))
            .bind(("emails", encode_list(&fields.emails)?))
            .bind(("phones", encode_list(&fields.phones)?))
            .bind(("siteprofile_uuids", uuid_strings(&fields.siteprofile_uuids)))
            .bind((
                "workflowlevel1_uuids",
                uuid_strings(&fields.workflowlevel1_uuids),
            ))
            .bind((
                "workflowlevel2_uuids",
                uuid_strings(&fields.workflowlevel2_uuids),
            ))
            .bind(("notes", fields.notes.clone()))
            .bind(("customer_id", customer_id))
            .await
            .map_err(DbError::from)?;

        let mut result = result.check().map_err(DbError::from_statement)?;

        let rows: Vec<ContactRow> = result.take(1).map_err(DbError::from)?;
        rows.into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("contact", id_str))?
            .try_into_contact()
    }
}

fn filter_conditions(filter: &ContactFilter) -> Vec<String> {
    let mut conditions = Vec::new();
    if filter.organization_id.is_some() {
        conditions.push("organization_id = $organization_id".to_string());
    }
    if !filter.workflowlevel2_uuids.is_empty() {
        conditions.push("workflowlevel2_uuids CONTAINSANY $workflowlevel2_uuids".to_string());
    }
    if !filter.siteprofile_uuids.is_empty() {
        conditions.push("siteprofile_uuids CONTAINSANY $siteprofile_uuids".to_string());
    }
    if filter.starts_with.is_some() {
        conditions.push(
            "(string::starts_with(string::lowercase(first_name), $starts_with) \
             OR string::starts_with(string::lowercase(last_name), $starts_with))"
                .to_string(),
        );
    }
    if filter.search.is_some() {
        conditions.push(
            "(string::contains(string::lowercase(first_name), $search) \
             OR string::contains(string::lowercase(last_name), $search))"
                .to_string(),
        );
    }
    if filter.contact_type.is_some() {
        conditions.push("contact_type = $contact_type".to_string());
    }
    conditions
}

fn order_clause(ordering: Ordering<ContactSortField>) -> String {
    let direction = ordering.direction.as_sql();
    match ordering.field {
        ContactSortField::Id => format!("ORDER BY id {direction}"),
        field => format!("ORDER BY {} {direction}, id {direction}", field.column()),
    }
}

impl<C: Connection> ContactRepository for SurrealContactRepository<C> {
    async fn create(&self, input: CreateContact) -> CrmResult<Contact> {
        let id = Uuid::new_v4();
        let contact = self
            .write(
                "CREATE",
                id,
                Some(input.organization_id),
                Some(input.user_id),
                &input.fields,
            )
            .await?;
        debug!(contact_id = %id, customer_id = ?contact.fields.customer_id, "Contact created");
        Ok(contact)
    }

    async fn get_by_id(&self, id: Uuid) -> CrmResult<Contact> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query(format!("{SELECT_CONTACT} type::record('contact', $id)"))
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ContactRow> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("contact", id_str))?;
        Ok(row.try_into_contact()?)
    }

    async fn get_many(&self, ids: &[Uuid]) -> CrmResult<Vec<Contact>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut result = self
            .db
            .query(format!("{SELECT_CONTACT} contact WHERE meta::id(id) IN $ids"))
            .bind(("ids", uuid_strings(ids)))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ContactRow> = result.take(0).map_err(DbError::from)?;
        let contacts = rows
            .into_iter()
            .map(|row| row.try_into_contact())
            .collect::<Result<Vec<_>, DbError>>()?;
        Ok(contacts)
    }

    async fn update(&self, contact: &Contact) -> CrmResult<Contact> {
        Ok(self
            .write("UPDATE", contact.id, None, None, &contact.fields)
            .await?)
    }

    async fn delete(&self, id: Uuid) -> CrmResult<()> {
        self.db
            .query("DELETE type::record('contact', $id)")
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::from_statement)?;
        Ok(())
    }

    async fn list(
        &self,
        filter: &ContactFilter,
        ordering: Ordering<ContactSortField>,
        pagination: Pagination,
    ) -> CrmResult<PaginatedResult<Contact>> {
        let where_sql = where_clause(&filter_conditions(filter));
        let query = format!(
            "SELECT count() AS total FROM contact {where_sql} GROUP ALL; \
             {SELECT_CONTACT} contact {where_sql} {} \
             LIMIT $limit START $offset;",
            order_clause(ordering)
        );

        let mut result = self
            .db
            .query(query)
            .bind((
                "organization_id",
                filter.organization_id.map(|u| u.to_string()),
            ))
            .bind((
                "workflowlevel2_uuids",
                uuid_strings(&filter.workflowlevel2_uuids),
            ))
            .bind(("siteprofile_uuids", uuid_strings(&filter.siteprofile_uuids)))
            .bind(("starts_with", filter.starts_with.clone()))
            .bind(("search", filter.search.clone()))
            .bind(("contact_type", filter.contact_type.map(|u| u.to_string())))
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let count_rows: Vec<CountRow> = result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        let rows: Vec<ContactRow> = result.take(1).map_err(DbError::from)?;
        let items = rows
            .into_iter()
            .map(|row| row.try_into_contact())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }

    async fn max_customer_id(&self, organization_id: Uuid) -> CrmResult<Option<i64>> {
        let mut result = self
            .db
            .query(
                "SELECT customer_id FROM contact \
                 WHERE organization_id = $organization_id \
                 ORDER BY customer_id DESC LIMIT 1",
            )
            .bind(("organization_id", organization_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<CustomerIdRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows.first().map(|r| r.customer_id))
    }
}
