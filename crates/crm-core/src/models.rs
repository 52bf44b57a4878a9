//! Domain models for the CRM service.
//!
//! Each record type comes with a `*Fields` struct holding the editable
//! attributes, a `Create*` struct for inserts and an `Update*` struct for
//! partial merges.

pub mod appointment;
pub mod contact;
pub mod contact_type;
pub mod driving_time;
pub mod note;
pub mod notification;

use serde::{Deserialize, Deserializer};

/// Deserializes a nullable field of a partial update.
///
/// Use with `#[serde(default, deserialize_with = "double_option")]`:
/// an absent key stays `None`, `null` becomes `Some(None)` and a value
/// becomes `Some(Some(v))`.
pub fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
