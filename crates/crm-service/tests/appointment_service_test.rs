//! Integration tests for the appointment and note services.

use chrono::{DateTime, Duration, TimeZone, Utc};
use crm_core::error::CrmError;
use crm_core::filter::QueryParams;
use crm_core::identity::IdentityContext;
use crm_core::models::appointment::{AppointmentFields, AppointmentInput, UpdateAppointment};
use crm_core::models::contact::ContactFields;
use crm_core::models::note::{NoteInput, NoteType, UpdateAppointmentNote};
use crm_core::notes::DUPLICATE_TYPE_MESSAGE;
use crm_core::validation::{DATE_ORDER_MESSAGE, EMPTY_TYPE_MESSAGE};
use crm_db::repository::{
    SurrealAppointmentNoteRepository, SurrealAppointmentRepository, SurrealContactRepository,
    SurrealContactTypeRepository,
};
use crm_service::{AppointmentService, AppointmentView, ContactService, NoopIndex, NoteService};
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use uuid::Uuid;

type Appointments = AppointmentService<
    SurrealAppointmentRepository<Db>,
    SurrealContactRepository<Db>,
    NoopIndex,
>;
type Notes = NoteService<SurrealAppointmentNoteRepository<Db>, SurrealAppointmentRepository<Db>>;
type Contacts =
    ContactService<SurrealContactRepository<Db>, SurrealContactTypeRepository<Db>, NoopIndex>;

struct Fixture {
    appointments: Appointments,
    notes: Notes,
    contacts: Contacts,
}

async fn setup() -> Fixture {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    crm_db::run_migrations(&db).await.unwrap();

    Fixture {
        appointments: AppointmentService::new(
            SurrealAppointmentRepository::new(db.clone()),
            SurrealContactRepository::new(db.clone()),
            NoopIndex,
        ),
        notes: NoteService::new(
            SurrealAppointmentNoteRepository::new(db.clone()),
            SurrealAppointmentRepository::new(db.clone()),
        ),
        contacts: ContactService::new(
            SurrealContactRepository::new(db.clone()),
            SurrealContactTypeRepository::new(db),
            NoopIndex,
        ),
    }
}

fn member(org: Uuid) -> IdentityContext {
    IdentityContext::member(org, Uuid::new_v4(), "Test User")
}

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2018, 1, 1, 12, 15, 0).unwrap()
}

fn input(name: &str, start: DateTime<Utc>, notes: Vec<NoteInput>) -> AppointmentInput {
    AppointmentInput {
        fields: AppointmentFields {
            name: name.into(),
            start_date: start,
            end_date: start + Duration::minutes(15),
            types: vec!["Test Type".into()],
            address: "Oderberger Straße 16A".into(),
            siteprofile_uuid: None,
            contact_uuid: None,
            invitee_uuids: Vec::new(),
            workflowlevel2_uuids: Vec::new(),
        },
        notes,
    }
}

fn note(kind: NoteType, text: &str) -> NoteInput {
    NoteInput {
        note: text.into(),
        kind,
    }
}

fn params(pairs: &[(&str, &str)]) -> QueryParams {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn cursor_of(url: &str) -> String {
    url.split("cursor=").nth(1).unwrap().to_string()
}

#[tokio::test]
async fn create_with_notes() {
    let f = setup().await;
    let org = Uuid::new_v4();
    let identity = member(org);

    let created = f
        .appointments
        .create(
            &identity,
            input(
                "Kickoff",
                start(),
                vec![note(NoteType::Primary, "bring plans"), note(NoteType::OooNote, "")],
            ),
        )
        .await
        .unwrap();
    assert_eq!(created.organization_id, org);
    assert_eq!(Some(created.owner), identity.user_id);
    assert_eq!(created.notes.len(), 2);

    let AppointmentView::Plain(loaded) = f.appointments.get(&identity, created.id, false).await.unwrap()
    else {
        panic!("expected plain view");
    };
    assert_eq!(loaded.notes, created.notes);
}

#[tokio::test]
async fn invalid_appointments_are_rejected() {
    let f = setup().await;
    let identity = member(Uuid::new_v4());

    let mut reversed = input("Reversed", start(), vec![]);
    reversed.fields.end_date = start() - Duration::hours(1);
    let err = f.appointments.create(&identity, reversed).await.unwrap_err();
    assert!(matches!(err, CrmError::Validation { ref message, .. } if message == DATE_ORDER_MESSAGE));

    let mut untyped = input("Untyped", start(), vec![]);
    untyped.fields.types.clear();
    let err = f.appointments.create(&identity, untyped).await.unwrap_err();
    assert!(matches!(err, CrmError::Validation { ref message, .. } if message == EMPTY_TYPE_MESSAGE));

    let duplicated = input(
        "Duplicated",
        start(),
        vec![note(NoteType::Primary, "a"), note(NoteType::Primary, "b")],
    );
    let err = f.appointments.create(&identity, duplicated).await.unwrap_err();
    assert!(matches!(err, CrmError::Validation { ref message, .. } if message == DUPLICATE_TYPE_MESSAGE));
}

#[tokio::test]
async fn update_reconciles_notes_by_type() {
    let f = setup().await;
    let identity = member(Uuid::new_v4());
    let created = f
        .appointments
        .create(
            &identity,
            input(
                "Notes",
                start(),
                vec![note(NoteType::Primary, "old"), note(NoteType::Secondary, "keep")],
            ),
        )
        .await
        .unwrap();
    let primary_id = created
        .notes
        .iter()
        .find(|n| n.kind == NoteType::Primary)
        .unwrap()
        .id;

    let update = UpdateAppointment {
        notes: Some(vec![note(NoteType::Primary, "new"), note(NoteType::OooReason, "ill")]),
        ..Default::default()
    };
    let updated = f.appointments.update(&identity, created.id, update).await.unwrap();
    assert_eq!(updated.notes.len(), 3);

    let AppointmentView::Plain(reloaded) = f.appointments.get(&identity, created.id, false).await.unwrap()
    else {
        panic!("expected plain view");
    };
    let primary = reloaded
        .notes
        .iter()
        .find(|n| n.kind == NoteType::Primary)
        .unwrap();
    assert_eq!(primary.id, primary_id);
    assert_eq!(primary.note, "new");
    assert!(reloaded.notes.iter().any(|n| n.kind == NoteType::Secondary && n.note == "keep"));
    assert!(reloaded.notes.iter().any(|n| n.kind == NoteType::OooReason));
}

#[tokio::test]
async fn cross_organization_access_is_denied() {
    let f = setup().await;
    let org = Uuid::new_v4();
    let created = f
        .appointments
        .create(&member(org), input("Private", start(), vec![]))
        .await
        .unwrap();

    assert!(f.appointments.get(&member(org), created.id, false).await.is_ok());
    assert!(matches!(
        f.appointments.get(&member(Uuid::new_v4()), created.id, false).await,
        Err(CrmError::AuthorizationDenied { .. })
    ));
    assert!(matches!(
        f.appointments
            .update(&member(Uuid::new_v4()), created.id, UpdateAppointment::default())
            .await,
        Err(CrmError::AuthorizationDenied { .. })
    ));
}

#[tokio::test]
async fn thirty_two_appointments_page_by_thirty() {
    let f = setup().await;
    let identity = member(Uuid::new_v4());
    for i in 0..32 {
        f.appointments
            .create(&identity, input(&format!("A{i:02}"), start() + Duration::hours(i), vec![]))
            .await
            .unwrap();
    }

    let first = f
        .appointments
        .list(&identity, &QueryParams::new(), "/api/appointments")
        .await
        .unwrap();
    assert_eq!(first.results.len(), 30);
    assert!(first.previous.is_none());
    let next = first.next.expect("next link");

    let second = f
        .appointments
        .list(&identity, &params(&[("cursor", &cursor_of(&next))]), "/api/appointments")
        .await
        .unwrap();
    assert_eq!(second.results.len(), 2);
    assert!(second.next.is_none());
    assert!(second.previous.is_some());

    let mut seen: Vec<Uuid> = first
        .results
        .iter()
        .chain(second.results.iter())
        .map(|v| v.appointment().id)
        .collect();
    seen.sort();
    seen.dedup();
    assert_eq!(seen.len(), 32);
}

#[tokio::test]
async fn list_filters_owner_me_and_rejects_bad_owner() {
    let f = setup().await;
    let org = Uuid::new_v4();
    let me = member(org);
    let colleague = member(org);

    f.appointments.create(&me, input("Mine", start(), vec![])).await.unwrap();
    f.appointments
        .create(&colleague, input("Theirs", start(), vec![]))
        .await
        .unwrap();

    let mine = f
        .appointments
        .list(&me, &params(&[("owner", "me")]), "/api/appointments")
        .await
        .unwrap();
    assert_eq!(mine.results.len(), 1);
    assert_eq!(mine.results[0].appointment().fields.name, "Mine");

    let colleague_id = colleague.user_id.unwrap().to_string();
    let theirs = f
        .appointments
        .list(&me, &params(&[("owner", &colleague_id)]), "/api/appointments")
        .await
        .unwrap();
    assert_eq!(theirs.results.len(), 1);
    assert_eq!(theirs.results[0].appointment().fields.name, "Theirs");

    let err = f
        .appointments
        .list(&me, &params(&[("owner", "abc")]), "/api/appointments")
        .await
        .unwrap_err();
    match err {
        CrmError::Validation { field, message } => {
            assert_eq!(field, "owner");
            assert!(message.contains("\"me\""));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn denormalize_embeds_contact_name() {
    let f = setup().await;
    let identity = member(Uuid::new_v4());
    let contact = f
        .contacts
        .create(
            &identity,
            ContactFields {
                first_name: "Nina".into(),
                last_name: "Simone".into(),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let mut with_contact = input("Linked", start(), vec![]);
    with_contact.fields.contact_uuid = Some(contact.id);
    let created = f.appointments.create(&identity, with_contact).await.unwrap();

    let view = f.appointments.get(&identity, created.id, true).await.unwrap();
    let json = serde_json::to_value(&view).unwrap();
    assert_eq!(json["contact"]["first_name"], "Nina");
    assert_eq!(json["contact"]["uuid"], contact.id.to_string());
    assert_eq!(json["name"], "Linked");

    let page = f
        .appointments
        .list(&identity, &params(&[("denormalize", "True")]), "/api/appointments")
        .await
        .unwrap();
    assert!(matches!(page.results[0], AppointmentView::Denormalized(_)));
}

#[tokio::test]
async fn deleting_appointment_keeps_notes_orphaned() {
    let f = setup().await;
    let identity = member(Uuid::new_v4());
    let created = f
        .appointments
        .create(&identity, input("Doomed", start(), vec![note(NoteType::Primary, "x")]))
        .await
        .unwrap();
    let note_id = created.notes[0].id;

    f.appointments.delete(&identity, created.id).await.unwrap();
    assert!(matches!(
        f.appointments.get(&identity, created.id, false).await,
        Err(CrmError::NotFound { .. })
    ));
    // Without a parent nobody but a superuser can reach the note.
    assert!(matches!(
        f.notes.get(&identity, note_id).await,
        Err(CrmError::AuthorizationDenied { .. })
    ));
    assert!(f.notes.get(&IdentityContext::superuser(), note_id).await.is_ok());
}

// -----------------------------------------------------------------------
// Notes
// -----------------------------------------------------------------------

#[tokio::test]
async fn notes_are_authorized_through_their_appointment() {
    let f = setup().await;
    let org = Uuid::new_v4();
    let identity = member(org);
    let created = f
        .appointments
        .create(
            &identity,
            input(
                "Noted",
                start(),
                vec![note(NoteType::Primary, "one"), note(NoteType::Secondary, "two")],
            ),
        )
        .await
        .unwrap();
    let primary = created.notes[0].clone();

    assert_eq!(f.notes.get(&member(org), primary.id).await.unwrap(), primary);
    assert!(matches!(
        f.notes.get(&member(Uuid::new_v4()), primary.id).await,
        Err(CrmError::AuthorizationDenied { .. })
    ));

    let edited = f
        .notes
        .update(
            &identity,
            primary.id,
            UpdateAppointmentNote {
                note: Some("edited".into()),
                kind: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(edited.note, "edited");

    // Retyping onto a type the appointment already has is rejected.
    let clash = f
        .notes
        .update(
            &identity,
            primary.id,
            UpdateAppointmentNote {
                note: None,
                kind: Some(NoteType::Secondary),
            },
        )
        .await;
    assert!(matches!(clash, Err(CrmError::Validation { .. })));

    assert_eq!(f.notes.list(&identity).await.unwrap().len(), 2);
    assert!(f.notes.list(&member(Uuid::new_v4())).await.unwrap().is_empty());

    f.notes.delete(&identity, primary.id).await.unwrap();
    let AppointmentView::Plain(reloaded) = f.appointments.get(&identity, created.id, false).await.unwrap()
    else {
        panic!("expected plain view");
    };
    assert_eq!(reloaded.notes.len(), 1);
}
