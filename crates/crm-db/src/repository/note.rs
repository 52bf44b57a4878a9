//! SurrealDB implementation of [`AppointmentNoteRepository`].
//!
//! Notes live in their own table and are attached to appointments through
//! `appointment -> has_note -> appointment_note` edges.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use crm_core::error::CrmResult;
use crm_core::models::note::{AppointmentNote, NoteType};
use crm_core::repository::AppointmentNoteRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::{parse_uuid, uuid_strings};
use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct NoteRow {
    record_id: String,
    note: String,
    note_type: i64,
}

/// A note as seen through one of its edges.
#[derive(Debug, SurrealValue)]
struct LinkedNoteRow {
    appointment_id: String,
    record_id: String,
    note: String,
    note_type: i64,
    #[allow(dead_code)]
    created_at: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct ParentRow {
    appointment_id: String,
    #[allow(dead_code)]
    created_at: DateTime<Utc>,
}

fn parse_note_type(code: i64) -> Result<NoteType, DbError> {
    u8::try_from(code)
        .map_err(|_| DbError::Decode(format!("unknown note type: {code}")))
        .and_then(|c| NoteType::try_from(c).map_err(DbError::Decode))
}

fn into_note(record_id: &str, note: String, note_type: i64) -> Result<AppointmentNote, DbError> {
    Ok(AppointmentNote {
        id: parse_uuid(record_id, "note")?,
        note,
        kind: parse_note_type(note_type)?,
    })
}

impl NoteRow {
    fn try_into_note(self) -> Result<AppointmentNote, DbError> {
        into_note(&self.record_id, self.note, self.note_type)
    }
}

/// Notes of several appointments at once, keyed by appointment id, each
/// list in link order.
pub(crate) async fn notes_by_appointment<C: Connection>(
    db: &Surreal<C>,
    appointment_ids: &[Uuid],
) -> Result<HashMap<Uuid, Vec<AppointmentNote>>, DbError> {
    let mut notes: HashMap<Uuid, Vec<AppointmentNote>> = HashMap::new();
    if appointment_ids.is_empty() {
        return Ok(notes);
    }

    let mut result = db
        .query(
            "SELECT meta::id(in) AS appointment_id, meta::id(out) AS record_id, \
             out.note AS note, out.note_type AS note_type, created_at \
             FROM has_note \
             WHERE meta::id(in) IN $ids AND out.note_type != NONE \
             ORDER BY created_at ASC",
        )
        .bind(("ids", uuid_strings(appointment_ids)))
        .await?;

    let rows: Vec<LinkedNoteRow> = result.take(0)?;
    for row in rows {
        let appointment_id = parse_uuid(&row.appointment_id, "appointment")?;
        let note = into_note(&row.record_id, row.note, row.note_type)?;
        notes.entry(appointment_id).or_default().push(note);
    }
    Ok(notes)
}

/// Note statements for one appointment write, meant to run inside the
/// caller's transaction.
///
/// Record keys are UUIDs and are inlined; texts, type codes and link
/// stamps are read by index from the `$note_texts`, `$note_types` and
/// `$linked_at` parameters, bound from the matching fields.
#[derive(Debug, Default)]
pub(crate) struct NoteWrites {
    statements: Vec<String>,
    pub(crate) texts: Vec<String>,
    pub(crate) types: Vec<i64>,
    pub(crate) linked_at: Vec<DateTime<Utc>>,
}

impl NoteWrites {
    pub(crate) fn new(
        appointment_id: Uuid,
        updates: &[AppointmentNote],
        inserts: &[AppointmentNote],
    ) -> Self {
        let mut writes = Self::default();
        for note in updates {
            let slot = writes.push_values(note);
            writes.statements.push(format!(
                "UPDATE appointment_note:`{}` SET \
                 note = $note_texts[{slot}], note_type = $note_types[{slot}];",
                note.id
            ));
        }

        // Explicit stamps keep link order stable within one transaction.
        let now = Utc::now();
        for note in inserts {
            let slot = writes.push_values(note);
            let link = writes.linked_at.len();
            writes
                .linked_at
                .push(now + chrono::Duration::microseconds(link as i64));
            writes.statements.push(format!(
                "CREATE appointment_note:`{id}` SET \
                 note = $note_texts[{slot}], note_type = $note_types[{slot}]; \
                 RELATE appointment:`{appointment_id}` -> has_note -> \
                 appointment_note:`{id}` SET created_at = $linked_at[{link}];",
                id = note.id
            ));
        }
        writes
    }

    fn push_values(&mut self, note: &AppointmentNote) -> usize {
        self.texts.push(note.note.clone());
        self.types.push(i64::from(note.kind.code()));
        self.texts.len() - 1
    }

    pub(crate) fn statements(&self) -> String {
        self.statements.join(" ")
    }
}

/// SurrealDB implementation of the AppointmentNote repository.
#[derive(Clone)]
pub struct SurrealAppointmentNoteRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealAppointmentNoteRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> AppointmentNoteRepository for SurrealAppointmentNoteRepository<C> {
    async fn get_by_id(&self, id: Uuid) -> CrmResult<AppointmentNote> {
        let id_str = id.to_string();
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * \
                 FROM type::record('appointment_note', $id)",
            )
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<NoteRow> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("appointment_note", id_str))?;
        Ok(row.try_into_note()?)
    }

    async fn update(&self, note: &AppointmentNote) -> CrmResult<AppointmentNote> {
        let id_str = note.id.to_string();
        let result = self
            .db
            .query(
                "UPDATE type::record('appointment_note', $id) SET \
                 note = $note, note_type = $note_type; \
                 SELECT meta::id(id) AS record_id, * \
                 FROM type::record('appointment_note', $id);",
            )
            .bind(("id", id_str.clone()))
            .bind(("note", note.note.clone()))
            .bind(("note_type", i64::from(note.kind.code())))
            .await
            .map_err(DbError::from)?;

        let mut result = result.check().map_err(DbError::from_statement)?;
        let rows: Vec<NoteRow> = result.take(1).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("appointment_note", id_str))?;
        Ok(row.try_into_note()?)
    }

    async fn delete(&self, id: Uuid) -> CrmResult<()> {
        self.db
            .query(
                "DELETE has_note WHERE out = type::record('appointment_note', $id); \
                 DELETE type::record('appointment_note', $id);",
            )
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::from_statement)?;
        Ok(())
    }

    async fn list_for_appointment(&self, appointment_id: Uuid) -> CrmResult<Vec<AppointmentNote>> {
        let mut by_appointment = notes_by_appointment(&self.db, &[appointment_id]).await?;
        Ok(by_appointment.remove(&appointment_id).unwrap_or_default())
    }

    async fn parent_ids(&self, note_id: Uuid) -> CrmResult<Vec<Uuid>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(in) AS appointment_id, created_at FROM has_note \
                 WHERE out = type::record('appointment_note', $id) \
                 ORDER BY created_at ASC",
            )
            .bind(("id", note_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ParentRow> = result.take(0).map_err(DbError::from)?;
        let ids = rows
            .iter()
            .map(|row| parse_uuid(&row.appointment_id, "appointment"))
            .collect::<Result<Vec<_>, DbError>>()?;
        Ok(ids)
    }

    async fn list(&self, organization_id: Option<Uuid>) -> CrmResult<Vec<AppointmentNote>> {
        let query = if organization_id.is_some() {
            "SELECT meta::id(id) AS record_id, * FROM appointment_note \
             WHERE id IN (\
                 SELECT VALUE out FROM has_note \
                 WHERE in.organization_id = $organization_id\
             ) \
             ORDER BY id ASC"
        } else {
            "SELECT meta::id(id) AS record_id, * FROM appointment_note ORDER BY id ASC"
        };

        let mut result = self
            .db
            .query(query)
            .bind(("organization_id", organization_id.map(|u| u.to_string())))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<NoteRow> = result.take(0).map_err(DbError::from)?;
        let notes = rows
            .into_iter()
            .map(|row| row.try_into_note())
            .collect::<Result<Vec<_>, DbError>>()?;
        Ok(notes)
    }
}
