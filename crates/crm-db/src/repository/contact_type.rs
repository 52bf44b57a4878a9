//! SurrealDB implementation of [`ContactTypeRepository`].

use chrono::{DateTime, Utc};
use crm_core::error::CrmResult;
use crm_core::filter::ContactTypeFilter;
use crm_core::models::contact_type::{ContactType, CreateContactType};
use crm_core::repository::ContactTypeRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::parse_uuid;
use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct ContactTypeRow {
    record_id: String,
    organization_id: String,
    name: String,
    is_global: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ContactTypeRow {
    fn try_into_contact_type(self) -> Result<ContactType, DbError> {
        Ok(ContactType {
            id: parse_uuid(&self.record_id, "contact type")?,
            organization_id: parse_uuid(&self.organization_id, "organization")?,
            name: self.name,
            is_global: self.is_global,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// SurrealDB implementation of the ContactType repository.
#[derive(Clone)]
pub struct SurrealContactTypeRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealContactTypeRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn fetch(&self, id: &str) -> Result<ContactType, DbError> {
        let mut result = self
            .db
            .query("SELECT meta::id(id) AS record_id, * FROM type::record('contact_type', $id)")
            .bind(("id", id.to_string()))
            .await?;

        let rows: Vec<ContactTypeRow> = result.take(0)?;
        rows.into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("contact_type", id))?
            .try_into_contact_type()
    }
}

impl<C: Connection> ContactTypeRepository for SurrealContactTypeRepository<C> {
    async fn create(&self, input: CreateContactType) -> CrmResult<ContactType> {
        let id_str = Uuid::new_v4().to_string();

        self.db
            .query(
                "CREATE type::record('contact_type', $id) SET \
                 organization_id = $organization_id, \
                 name = $name, is_global = $is_global",
            )
            .bind(("id", id_str.clone()))
            .bind(("organization_id", input.organization_id.to_string()))
            .bind(("name", input.name))
            .bind(("is_global", input.is_global))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::from_statement)?;

        Ok(self.fetch(&id_str).await?)
    }

    async fn get_by_id(&self, id: Uuid) -> CrmResult<ContactType> {
        Ok(self.fetch(&id.to_string()).await?)
    }

    async fn update(&self, contact_type: &ContactType) -> CrmResult<ContactType> {
        let id_str = contact_type.id.to_string();

        self.db
            .query(
                "UPDATE type::record('contact_type', $id) SET \
                 name = $name, is_global = $is_global, \
                 updated_at = time::now()",
            )
            .bind(("id", id_str.clone()))
            .bind(("name", contact_type.name.clone()))
            .bind(("is_global", contact_type.is_global))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::from_statement)?;

        Ok(self.fetch(&id_str).await?)
    }

    async fn delete(&self, id: Uuid) -> CrmResult<()> {
        // Contacts keep existing without a type.
        self.db
            .query(
                "UPDATE contact SET contact_type = NONE WHERE contact_type = $id; \
                 DELETE type::record('contact_type', $id);",
            )
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::from_statement)?;
        Ok(())
    }

    async fn list(&self, filter: &ContactTypeFilter) -> CrmResult<Vec<ContactType>> {
        let where_sql = match (filter.global_only, filter.organization_id) {
            (true, _) => "WHERE is_global = true",
            (false, Some(_)) => "WHERE organization_id = $organization_id OR is_global = true",
            (false, None) => "",
        };

        let mut result = self
            .db
            .query(format!(
                "SELECT meta::id(id) AS record_id, * FROM contact_type {where_sql} \
                 ORDER BY name ASC, id ASC"
            ))
            .bind((
                "organization_id",
                filter.organization_id.map(|u| u.to_string()),
            ))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ContactTypeRow> = result.take(0).map_err(DbError::from)?;
        let types = rows
            .into_iter()
            .map(|row| row.try_into_contact_type())
            .collect::<Result<Vec<_>, DbError>>()?;
        Ok(types)
    }
}
