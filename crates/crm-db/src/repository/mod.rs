//! SurrealDB repository implementations.

mod appointment;
mod contact;
mod contact_type;
mod driving_time;
mod note;
mod notification;

pub use appointment::SurrealAppointmentRepository;
pub use contact::SurrealContactRepository;
pub use contact_type::SurrealContactTypeRepository;
pub use driving_time::SurrealDrivingTimeRepository;
pub use note::SurrealAppointmentNoteRepository;
pub use notification::SurrealNotificationRepository;

use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;

/// Row struct for count queries.
#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

fn parse_uuid(value: &str, what: &str) -> Result<Uuid, DbError> {
    Uuid::parse_str(value).map_err(|e| DbError::Decode(format!("invalid {what} UUID: {e}")))
}

fn parse_opt_uuid(value: Option<String>, what: &str) -> Result<Option<Uuid>, DbError> {
    value.map(|v| parse_uuid(&v, what)).transpose()
}

fn parse_uuids(values: Vec<String>, what: &str) -> Result<Vec<Uuid>, DbError> {
    values.iter().map(|v| parse_uuid(v, what)).collect()
}

fn uuid_strings(values: &[Uuid]) -> Vec<String> {
    values.iter().map(Uuid::to_string).collect()
}

/// `WHERE` clause from a list of conjunctive conditions.
fn where_clause(conditions: &[String]) -> String {
    if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    }
}
