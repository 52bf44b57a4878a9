//! Merging incoming appointment notes into the stored ones.
//!
//! Notes are matched by type: an incoming note updates the stored note of
//! the same type in place, otherwise it becomes a new note. Stored notes
//! no incoming note mentions are left alone.

use std::collections::HashSet;

use uuid::Uuid;

use crate::error::{CrmError, CrmResult};
use crate::models::note::{AppointmentNote, NoteInput};

pub const DUPLICATE_TYPE_MESSAGE: &str = "every type is only allowed once";

/// What has to be written to bring an appointment's notes up to date.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotePlan {
    /// Existing notes whose text changed, with their ids kept.
    pub updates: Vec<AppointmentNote>,
    /// New notes to create and attach, with fresh ids.
    pub inserts: Vec<AppointmentNote>,
    /// The complete note list after the plan is applied.
    pub merged: Vec<AppointmentNote>,
}

impl NotePlan {
    pub fn is_empty(&self) -> bool {
        self.updates.is_empty() && self.inserts.is_empty()
    }
}

/// Reject an incoming note list that names a type more than once.
pub fn check_unique_types(incoming: &[NoteInput]) -> CrmResult<()> {
    let mut seen = HashSet::new();
    if incoming.iter().all(|note| seen.insert(note.kind)) {
        Ok(())
    } else {
        Err(CrmError::validation("notes", DUPLICATE_TYPE_MESSAGE))
    }
}

/// Plan the upsert-by-type of `incoming` onto `existing`.
pub fn reconcile(existing: &[AppointmentNote], incoming: Vec<NoteInput>) -> CrmResult<NotePlan> {
    check_unique_types(&incoming)?;

    let mut merged = existing.to_vec();
    let mut updates = Vec::new();
    let mut inserts = Vec::new();

    for input in incoming {
        match merged.iter_mut().find(|note| note.kind == input.kind) {
            Some(note) => {
                if note.note != input.note {
                    note.note = input.note;
                    updates.push(note.clone());
                }
            }
            None => inserts.push(AppointmentNote {
                id: Uuid::new_v4(),
                note: input.note,
                kind: input.kind,
            }),
        }
    }
    merged.extend(inserts.iter().cloned());

    Ok(NotePlan {
        updates,
        inserts,
        merged,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::note::NoteType;

    fn stored(kind: NoteType, text: &str) -> AppointmentNote {
        AppointmentNote {
            id: Uuid::new_v4(),
            note: text.into(),
            kind,
        }
    }

    fn input(kind: NoteType, text: &str) -> NoteInput {
        NoteInput {
            note: text.into(),
            kind,
        }
    }

    #[test]
    fn updates_matching_type_in_place() {
        let primary = stored(NoteType::Primary, "old");
        let plan = reconcile(
            std::slice::from_ref(&primary),
            vec![input(NoteType::Primary, "new")],
        )
        .unwrap();

        assert!(plan.inserts.is_empty());
        assert_eq!(plan.updates.len(), 1);
        assert_eq!(plan.updates[0].id, primary.id);
        assert_eq!(plan.merged, vec![AppointmentNote {
            note: "new".into(),
            ..primary
        }]);
    }

    #[test]
    fn inserts_unknown_types_and_keeps_untouched() {
        let primary = stored(NoteType::Primary, "keep me");
        let plan = reconcile(
            std::slice::from_ref(&primary),
            vec![input(NoteType::OooReason, "vacation")],
        )
        .unwrap();

        assert!(plan.updates.is_empty());
        assert_eq!(plan.inserts.len(), 1);
        assert_eq!(plan.inserts[0].kind, NoteType::OooReason);
        assert_eq!(plan.merged.len(), 2);
        assert_eq!(plan.merged[0], primary);
    }

    #[test]
    fn duplicate_incoming_types_are_rejected() {
        let err = reconcile(
            &[],
            vec![
                input(NoteType::Secondary, "a"),
                input(NoteType::Secondary, "b"),
            ],
        )
        .unwrap_err();
        match err {
            CrmError::Validation { field, message } => {
                assert_eq!(field, "notes");
                assert_eq!(message, DUPLICATE_TYPE_MESSAGE);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn empty_text_is_a_valid_update() {
        let secondary = stored(NoteType::Secondary, "something");
        let plan = reconcile(&[secondary], vec![input(NoteType::Secondary, "")]).unwrap();
        assert_eq!(plan.updates.len(), 1);
        assert_eq!(plan.merged[0].note, "");
    }

    #[test]
    fn unchanged_notes_produce_an_empty_plan() {
        let primary = stored(NoteType::Primary, "same");
        let plan = reconcile(
            std::slice::from_ref(&primary),
            vec![input(NoteType::Primary, "same")],
        )
        .unwrap();
        assert!(plan.is_empty());
        assert_eq!(plan.merged, vec![primary]);
    }
}
