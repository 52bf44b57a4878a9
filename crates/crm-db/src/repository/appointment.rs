//! SurrealDB implementation of [`AppointmentRepository`].

use chrono::{DateTime, Utc};
use crm_core::error::CrmResult;
use crm_core::filter::{AppointmentFilter, AppointmentSortField, Ordering, SortDirection, SortField};
use crm_core::models::appointment::{Appointment, AppointmentFields, CreateAppointment};
use crm_core::models::note::AppointmentNote;
use crm_core::notes::NotePlan;
use crm_core::pagination::CursorRequest;
use crm_core::repository::AppointmentRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::debug;
use uuid::Uuid;

use super::note::{NoteWrites, notes_by_appointment};
use super::{parse_opt_uuid, parse_uuid, parse_uuids, uuid_strings, where_clause};
use crate::error::DbError;

const SELECT_APPOINTMENT: &str = "SELECT meta::id(id) AS record_id, * FROM";

#[derive(Debug, SurrealValue)]
struct AppointmentRow {
    record_id: String,
    organization_id: String,
    owner: String,
    name: String,
    start_date: DateTime<Utc>,
    end_date: DateTime<Utc>,
    types: Vec<String>,
    address: String,
    siteprofile_uuid: Option<String>,
    contact_uuid: Option<String>,
    invitee_uuids: Vec<String>,
    workflowlevel2_uuids: Vec<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl AppointmentRow {
    /// Convert without notes; callers attach them afterwards.
    fn try_into_appointment(self) -> Result<Appointment, DbError> {
        Ok(Appointment {
            id: parse_uuid(&self.record_id, "appointment")?,
            owner: parse_uuid(&self.owner, "owner")?,
            organization_id: parse_uuid(&self.organization_id, "organization")?,
            fields: AppointmentFields {
                name: self.name,
                start_date: self.start_date,
                end_date: self.end_date,
                types: self.types,
                address: self.address,
                siteprofile_uuid: parse_opt_uuid(self.siteprofile_uuid, "siteprofile")?,
                contact_uuid: parse_opt_uuid(self.contact_uuid, "contact")?,
                invitee_uuids: parse_uuids(self.invitee_uuids, "invitee")?,
                workflowlevel2_uuids: parse_uuids(self.workflowlevel2_uuids, "workflowlevel2")?,
            },
            notes: Vec::new(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// SurrealDB implementation of the Appointment repository.
#[derive(Clone)]
pub struct SurrealAppointmentRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealAppointmentRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    /// Convert rows and attach each appointment's notes with one query.
    async fn hydrate(&self, rows: Vec<AppointmentRow>) -> Result<Vec<Appointment>, DbError> {
        let mut appointments = rows
            .into_iter()
            .map(|row| row.try_into_appointment())
            .collect::<Result<Vec<_>, DbError>>()?;

        let ids: Vec<Uuid> = appointments.iter().map(|a| a.id).collect();
        let mut notes = notes_by_appointment(&self.db, &ids).await?;
        for appointment in &mut appointments {
            appointment.notes = notes.remove(&appointment.id).unwrap_or_default();
        }
        Ok(appointments)
    }

    /// Write the appointment row and its note changes in one transaction.
    /// The caller reads the result back afterwards.
    async fn write(
        &self,
        statement: &str,
        id: Uuid,
        stamp: Option<(Uuid, Uuid)>,
        fields: &AppointmentFields,
        notes: NoteWrites,
    ) -> Result<(), DbError> {
        let mut sets = vec![
            "name = $name",
            "start_date = $start_date",
            "end_date = $end_date",
            "types = $types",
            "address = $address",
            "siteprofile_uuid = $siteprofile_uuid",
            "contact_uuid = $contact_uuid",
            "invitee_uuids = $invitee_uuids",
            "workflowlevel2_uuids = $workflowlevel2_uuids",
            "updated_at = time::now()",
        ];
        if stamp.is_some() {
            sets.push("owner = $owner");
            sets.push("organization_id = $organization_id");
        }

        let query = format!(
            "BEGIN TRANSACTION; \
             {statement} type::record('appointment', $id) SET {}; \
             {} \
             COMMIT TRANSACTION;",
            sets.join(", "),
            notes.statements()
        );

        self.db
            .query(query)
            .bind(("id", id.to_string()))
            .bind(("owner", stamp.map(|(owner, _)| owner.to_string())))
            .bind(("organization_id", stamp.map(|(_, org)| org.to_string())))
            .bind(("name", fields.name.clone()))
            .bind(("start_date", fields.start_date))
            .bind(("end_date", fields.end_date))
            .bind(("types", fields.types.clone()))
            .bind(("address", fields.address.clone()))
            .bind((
                "siteprofile_uuid",
                fields.siteprofile_uuid.map(|u| u.to_string()),
            ))
            .bind(("contact_uuid", fields.contact_uuid.map(|u| u.to_string())))
            .bind(("invitee_uuids", uuid_strings(&fields.invitee_uuids)))
            .bind((
                "workflowlevel2_uuids",
                uuid_strings(&fields.workflowlevel2_uuids),
            ))
            .bind(("note_texts", notes.texts))
            .bind(("note_types", notes.types))
            .bind(("linked_at", notes.linked_at))
            .await?
            .check()
            .map_err(DbError::from_statement)?;
        Ok(())
    }
}

fn filter_conditions(filter: &AppointmentFilter) -> Vec<String> {
    let mut conditions = Vec::new();
    if filter.organization_id.is_some() {
        conditions.push("organization_id = $organization_id".to_string());
    }
    if filter.contact_uuid.is_some() {
        conditions.push("contact_uuid = $contact_uuid".to_string());
    }
    if filter.owner.is_some() {
        conditions.push("owner = $owner".to_string());
    }
    if filter.invitee.is_some() {
        conditions.push("invitee_uuids CONTAINS $invitee".to_string());
    }
    if filter.workflowlevel2_uuid.is_some() {
        conditions.push("workflowlevel2_uuids CONTAINS $workflowlevel2_uuid".to_string());
    }
    if filter.start_date_gte.is_some() {
        conditions.push("start_date >= $start_date_gte".to_string());
    }
    if filter.start_date_lte.is_some() {
        conditions.push("start_date <= $start_date_lte".to_string());
    }
    conditions
}

/// Keyset condition and `ORDER BY` clause for one window of a listing.
///
/// Rows are ordered by `(column, id)`, both in the walking direction;
/// the window starts strictly after the cursor position.
fn keyset(
    ordering: Ordering<AppointmentSortField>,
    request: &CursorRequest,
) -> (Option<String>, String) {
    let walk = if request.is_reverse() {
        ordering.direction.reversed()
    } else {
        ordering.direction
    };
    let op = match walk {
        SortDirection::Asc => ">",
        SortDirection::Desc => "<",
    };
    let dir = walk.as_sql();
    let after_id = format!("id {op} type::record('appointment', $cursor_id)");

    let (condition, order) = match ordering.field {
        AppointmentSortField::Id => (after_id, format!("ORDER BY id {dir}")),
        field => {
            let column = field.column();
            let condition = match request.cursor.as_ref().and_then(|c| c.key) {
                Some(_) => format!(
                    "({column} {op} $cursor_key OR \
                     ({column} = $cursor_key AND {after_id}))"
                ),
                None => after_id,
            };
            (condition, format!("ORDER BY {column} {dir}, id {dir}"))
        }
    };

    (request.cursor.as_ref().map(|_| condition), order)
}

impl<C: Connection> AppointmentRepository for SurrealAppointmentRepository<C> {
    async fn create(
        &self,
        input: CreateAppointment,
        notes: &[AppointmentNote],
    ) -> CrmResult<Appointment> {
        let id = Uuid::new_v4();
        self.write(
            "CREATE",
            id,
            Some((input.owner, input.organization_id)),
            &input.fields,
            NoteWrites::new(id, &[], notes),
        )
        .await?;
        debug!(appointment_id = %id, notes = notes.len(), "Appointment created");
        self.get_by_id(id).await
    }

    async fn get_by_id(&self, id: Uuid) -> CrmResult<Appointment> {
        let id_str = id.to_string();
        let mut result = self
            .db
            .query(format!(
                "{SELECT_APPOINTMENT} type::record('appointment', $id)"
            ))
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<AppointmentRow> = result.take(0).map_err(DbError::from)?;
        let appointment = self
            .hydrate(rows)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("appointment", id_str))?;
        Ok(appointment)
    }

    async fn update(
        &self,
        appointment: &Appointment,
        notes: Option<&NotePlan>,
    ) -> CrmResult<Appointment> {
        let id = appointment.id;
        let writes = notes
            .map(|plan| NoteWrites::new(id, &plan.updates, &plan.inserts))
            .unwrap_or_default();
        self.write("UPDATE", id, None, &appointment.fields, writes)
            .await?;
        self.get_by_id(id).await
    }

    async fn delete(&self, id: Uuid) -> CrmResult<()> {
        self.db
            .query(
                "BEGIN TRANSACTION; \
                 DELETE appointment_notification WHERE appointment_id = $id; \
                 DELETE appointment_driving_time WHERE appointment_id = $id; \
                 DELETE has_note WHERE in = type::record('appointment', $id); \
                 DELETE type::record('appointment', $id); \
                 COMMIT TRANSACTION;",
            )
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::from_statement)?;
        debug!(appointment_id = %id, "Appointment deleted with dependents");
        Ok(())
    }

    async fn list_page(
        &self,
        filter: &AppointmentFilter,
        ordering: Ordering<AppointmentSortField>,
        request: &CursorRequest,
    ) -> CrmResult<Vec<Appointment>> {
        let mut conditions = filter_conditions(filter);
        let (after, order) = keyset(ordering, request);
        conditions.extend(after);

        let query = format!(
            "{SELECT_APPOINTMENT} appointment {} {order} LIMIT $limit",
            where_clause(&conditions)
        );

        let mut result = self
            .db
            .query(query)
            .bind((
                "organization_id",
                filter.organization_id.map(|u| u.to_string()),
            ))
            .bind(("contact_uuid", filter.contact_uuid.map(|u| u.to_string())))
            .bind(("owner", filter.owner.map(|u| u.to_string())))
            .bind(("invitee", filter.invitee.map(|u| u.to_string())))
            .bind((
                "workflowlevel2_uuid",
                filter.workflowlevel2_uuid.map(|u| u.to_string()),
            ))
            .bind(("start_date_gte", filter.start_date_gte))
            .bind(("start_date_lte", filter.start_date_lte))
            .bind((
                "cursor_id",
                request.cursor.as_ref().map(|c| c.id.to_string()),
            ))
            .bind(("cursor_key", request.cursor.as_ref().and_then(|c| c.key)))
            .bind(("limit", request.fetch_size() as u64))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<AppointmentRow> = result.take(0).map_err(DbError::from)?;
        Ok(self.hydrate(rows).await?)
    }
}
