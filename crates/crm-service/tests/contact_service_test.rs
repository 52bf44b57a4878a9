//! Integration tests for the contact and contact type services.

use crm_core::error::CrmError;
use crm_core::filter::QueryParams;
use crm_core::identity::IdentityContext;
use crm_core::models::contact::{ContactFields, Email, UpdateContact};
use crm_core::models::contact_type::{ContactTypeInput, UpdateContactType};
use crm_db::repository::{SurrealContactRepository, SurrealContactTypeRepository};
use crm_service::contact::{CUSTOMER_ID_EXHAUSTED_MESSAGE, FIRST_CUSTOMER_ID};
use crm_service::{ContactService, ContactTypeService, NoopIndex};
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use uuid::Uuid;

type Contacts = ContactService<SurrealContactRepository<Db>, SurrealContactTypeRepository<Db>, NoopIndex>;
type Types = ContactTypeService<SurrealContactTypeRepository<Db>>;

async fn setup() -> (Contacts, Types) {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    crm_db::run_migrations(&db).await.unwrap();

    let contacts = ContactService::new(
        SurrealContactRepository::new(db.clone()),
        SurrealContactTypeRepository::new(db.clone()),
        NoopIndex,
    );
    let types = ContactTypeService::new(SurrealContactTypeRepository::new(db));
    (contacts, types)
}

fn member(org: Uuid) -> IdentityContext {
    IdentityContext::member(org, Uuid::new_v4(), "Test User")
}

fn fields(first: &str) -> ContactFields {
    ContactFields {
        first_name: first.into(),
        last_name: "Tester".into(),
        ..Default::default()
    }
}

fn params(pairs: &[(&str, &str)]) -> QueryParams {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[tokio::test]
async fn customer_ids_are_assigned_per_organization() {
    let (contacts, _) = setup().await;
    let identity = member(Uuid::new_v4());

    let first = contacts.create(&identity, fields("One")).await.unwrap();
    let second = contacts.create(&identity, fields("Two")).await.unwrap();
    assert_eq!(first.fields.customer_id, Some(FIRST_CUSTOMER_ID));
    assert_eq!(second.fields.customer_id, Some(10002));

    let other = contacts
        .create(&member(Uuid::new_v4()), fields("Elsewhere"))
        .await
        .unwrap();
    assert_eq!(other.fields.customer_id, Some(FIRST_CUSTOMER_ID));
}

#[tokio::test]
async fn customer_id_after_the_largest_integer_is_rejected() {
    let (contacts, _) = setup().await;
    let identity = member(Uuid::new_v4());

    let mut top = fields("Top");
    top.customer_id = Some(i64::MAX);
    contacts.create(&identity, top).await.unwrap();

    let err = contacts.create(&identity, fields("Next")).await.unwrap_err();
    assert!(matches!(
        err,
        CrmError::Validation { ref field, ref message }
            if field == "customer_id" && message == CUSTOMER_ID_EXHAUSTED_MESSAGE
    ));

    // An explicit id still works.
    let mut explicit = fields("Explicit");
    explicit.customer_id = Some(7);
    assert!(contacts.create(&identity, explicit).await.is_ok());
}

#[tokio::test]
async fn explicit_duplicate_customer_id_is_a_conflict() {
    let (contacts, _) = setup().await;
    let identity = member(Uuid::new_v4());

    contacts.create(&identity, fields("One")).await.unwrap();
    let mut duplicate = fields("Two");
    duplicate.customer_id = Some(FIRST_CUSTOMER_ID);
    let result = contacts.create(&identity, duplicate).await;
    assert!(matches!(result, Err(CrmError::Conflict { .. })));
}

#[tokio::test]
async fn create_stamps_caller_and_validates_sub_records() {
    let (contacts, _) = setup().await;
    let org = Uuid::new_v4();
    let identity = member(org);

    let created = contacts.create(&identity, fields("Stamped")).await.unwrap();
    assert_eq!(created.organization_id, org);
    assert_eq!(Some(created.user_id), identity.user_id);

    let mut bad = fields("Bad");
    bad.emails = vec![Email {
        kind: "office".into(),
        email: "not-an-address".into(),
    }];
    let err = contacts.create(&identity, bad).await.unwrap_err();
    assert!(matches!(err, CrmError::Validation { ref field, .. } if field == "emails"));
}

#[tokio::test]
async fn anonymous_caller_is_rejected() {
    let (contacts, _) = setup().await;
    let err = contacts
        .create(&IdentityContext::anonymous(), fields("Nobody"))
        .await
        .unwrap_err();
    assert!(matches!(err, CrmError::AuthenticationRequired));

    let err = contacts
        .list(&IdentityContext::anonymous(), &QueryParams::new(), "/api/contacts")
        .await
        .unwrap_err();
    assert!(matches!(err, CrmError::AuthenticationRequired));
}

#[tokio::test]
async fn detail_access_follows_organization() {
    let (contacts, _) = setup().await;
    let org = Uuid::new_v4();
    let created = contacts.create(&member(org), fields("Shared")).await.unwrap();

    // Same organization, different caller.
    let colleague = member(org);
    assert_eq!(
        contacts.get(&colleague, created.id).await.unwrap().id,
        created.id
    );

    let stranger = member(Uuid::new_v4());
    assert!(matches!(
        contacts.get(&stranger, created.id).await,
        Err(CrmError::AuthorizationDenied { .. })
    ));
    assert!(matches!(
        contacts.delete(&stranger, created.id).await,
        Err(CrmError::AuthorizationDenied { .. })
    ));

    assert!(matches!(
        contacts.get(&colleague, Uuid::new_v4()).await,
        Err(CrmError::NotFound { .. })
    ));

    assert!(contacts.get(&IdentityContext::superuser(), created.id).await.is_ok());
}

#[tokio::test]
async fn partial_update_merges() {
    let (contacts, _) = setup().await;
    let identity = member(Uuid::new_v4());
    let mut input = fields("Before");
    input.company = Some("ACME".into());
    let created = contacts.create(&identity, input).await.unwrap();

    let update: UpdateContact = serde_json::from_str(r#"{"first_name": "After"}"#).unwrap();
    let updated = contacts.update(&identity, created.id, update).await.unwrap();
    assert_eq!(updated.fields.first_name, "After");
    assert_eq!(updated.fields.company.as_deref(), Some("ACME"));
    assert_eq!(updated.fields.customer_id, created.fields.customer_id);

    let blank: UpdateContact = serde_json::from_str(r#"{"first_name": " "}"#).unwrap();
    assert!(matches!(
        contacts.update(&identity, created.id, blank).await,
        Err(CrmError::Validation { .. })
    ));
}

#[tokio::test]
async fn list_pages_with_links() {
    let (contacts, _) = setup().await;
    let identity = member(Uuid::new_v4());
    for name in ["Anna", "Bert", "Carl"] {
        contacts.create(&identity, fields(name)).await.unwrap();
    }
    contacts
        .create(&member(Uuid::new_v4()), fields("Foreign"))
        .await
        .unwrap();

    let page = contacts
        .list(
            &identity,
            &params(&[("limit", "2"), ("ordering", "first_name")]),
            "/api/contacts?limit=2&ordering=first_name",
        )
        .await
        .unwrap();
    assert_eq!(page.count, 3);
    assert_eq!(page.results.len(), 2);
    assert_eq!(page.results[0].fields.first_name, "Anna");
    assert_eq!(
        page.next.as_deref(),
        Some("/api/contacts?ordering=first_name&limit=2&offset=2")
    );
    assert!(page.previous.is_none());

    let err = contacts
        .list(&identity, &params(&[("ordering", "nope")]), "/api/contacts")
        .await
        .unwrap_err();
    assert!(matches!(err, CrmError::Validation { ref field, .. } if field == "ordering"));
}

// -----------------------------------------------------------------------
// Contact types
// -----------------------------------------------------------------------

#[tokio::test]
async fn contact_type_must_be_visible() {
    let (contacts, types) = setup().await;
    let org = Uuid::new_v4();
    let other_org = Uuid::new_v4();

    let foreign = types
        .create(
            &member(other_org),
            ContactTypeInput {
                name: "Theirs".into(),
                is_global: false,
            },
        )
        .await
        .unwrap();
    let mut input = fields("Typed");
    input.contact_type = Some(foreign.id);
    let err = contacts.create(&member(org), input).await.unwrap_err();
    assert!(matches!(err, CrmError::Validation { ref field, .. } if field == "contact_type"));

    let global = types
        .create(
            &IdentityContext {
                organization_id: Some(other_org),
                ..IdentityContext::superuser()
            },
            ContactTypeInput {
                name: "Everyone".into(),
                is_global: true,
            },
        )
        .await
        .unwrap();
    let mut input = fields("Typed");
    input.contact_type = Some(global.id);
    let created = contacts.create(&member(org), input).await.unwrap();
    assert_eq!(created.fields.contact_type, Some(global.id));
}

#[tokio::test]
async fn global_types_are_read_only_for_members() {
    let (_, types) = setup().await;
    let org = Uuid::new_v4();
    let identity = member(org);

    let err = types
        .create(
            &identity,
            ContactTypeInput {
                name: "Global".into(),
                is_global: true,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, CrmError::AuthorizationDenied { .. }));

    let superuser = IdentityContext {
        organization_id: Some(Uuid::new_v4()),
        ..IdentityContext::superuser()
    };
    let global = types
        .create(
            &superuser,
            ContactTypeInput {
                name: "Global".into(),
                is_global: true,
            },
        )
        .await
        .unwrap();

    // Readable, not writable.
    assert_eq!(types.get(&identity, global.id).await.unwrap().name, "Global");
    let rename = UpdateContactType {
        name: Some("Mine now".into()),
        is_global: None,
    };
    assert!(matches!(
        types.update(&identity, global.id, rename).await,
        Err(CrmError::AuthorizationDenied { .. })
    ));
    assert!(matches!(
        types.delete(&identity, global.id).await,
        Err(CrmError::AuthorizationDenied { .. })
    ));

    let own = types
        .create(
            &identity,
            ContactTypeInput {
                name: "Own".into(),
                is_global: false,
            },
        )
        .await
        .unwrap();
    let listed = types.list(&identity, &QueryParams::new()).await.unwrap();
    assert_eq!(listed.len(), 2);
    let only_global = types
        .list(&identity, &params(&[("is_global", "true")]))
        .await
        .unwrap();
    assert_eq!(only_global.len(), 1);

    types.delete(&identity, own.id).await.unwrap();
}

#[tokio::test]
async fn foreign_private_type_is_denied_not_missing() {
    let (_, types) = setup().await;
    let private = types
        .create(
            &member(Uuid::new_v4()),
            ContactTypeInput {
                name: "Private".into(),
                is_global: false,
            },
        )
        .await
        .unwrap();

    let stranger = member(Uuid::new_v4());
    assert!(matches!(
        types.get(&stranger, private.id).await,
        Err(CrmError::AuthorizationDenied { .. })
    ));
    assert!(matches!(
        types.get(&stranger, Uuid::new_v4()).await,
        Err(CrmError::NotFound { .. })
    ));
}
