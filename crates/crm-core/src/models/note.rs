//! Appointment note domain model.
//!
//! Notes are related to appointments many-to-many. Within a single write
//! an appointment carries at most one note per [`NoteType`].

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of an appointment note, serialized as its integer code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum NoteType {
    Primary = 1,
    Secondary = 2,
    OooReason = 3,
    OooNote = 4,
}

impl NoteType {
    pub const ALL: [NoteType; 4] = [
        NoteType::Primary,
        NoteType::Secondary,
        NoteType::OooReason,
        NoteType::OooNote,
    ];

    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn label(self) -> &'static str {
        match self {
            NoteType::Primary => "Primary",
            NoteType::Secondary => "Secondary",
            NoteType::OooReason => "OOO-Reason",
            NoteType::OooNote => "OOO-Note",
        }
    }
}

impl TryFrom<u8> for NoteType {
    type Error = String;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(NoteType::Primary),
            2 => Ok(NoteType::Secondary),
            3 => Ok(NoteType::OooReason),
            4 => Ok(NoteType::OooNote),
            other => Err(format!("\"{other}\" is not a valid choice. Choices: 1, 2, 3, 4")),
        }
    }
}

impl From<NoteType> for u8 {
    fn from(kind: NoteType) -> Self {
        kind.code()
    }
}

impl fmt::Display for NoteType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppointmentNote {
    pub id: Uuid,
    pub note: String,
    #[serde(rename = "type")]
    pub kind: NoteType,
}

/// A note as supplied by a client on appointment writes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteInput {
    /// May be empty.
    #[serde(default)]
    pub note: String,
    #[serde(rename = "type", default = "default_note_type")]
    pub kind: NoteType,
}

fn default_note_type() -> NoteType {
    NoteType::Primary
}

/// Partial update of a single note through the notes endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateAppointmentNote {
    pub note: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<NoteType>,
}

impl UpdateAppointmentNote {
    pub fn apply_to(self, note: &mut AppointmentNote) {
        if let Some(text) = self.note {
            note.note = text;
        }
        if let Some(kind) = self.kind {
            note.kind = kind;
        }
    }
}
