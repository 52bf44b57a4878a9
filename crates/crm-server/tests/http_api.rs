use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use crm_core::pagination::CursorConfig;
use crm_db::{DbConfig, DbManager};
use crm_server::{AppState, ConfiguredMailer, router};
use crm_service::{InMemoryMailer, ServiceConfig};
use serde_json::{Value, json};
use tower::ServiceExt;
use uuid::Uuid;

struct Caller {
    org: Uuid,
    user: Uuid,
}

impl Caller {
    fn new() -> Self {
        Self {
            org: Uuid::new_v4(),
            user: Uuid::new_v4(),
        }
    }

    fn colleague(&self) -> Self {
        Self {
            org: self.org,
            user: Uuid::new_v4(),
        }
    }
}

async fn app_with(mailer: InMemoryMailer, config: ServiceConfig) -> Router {
    let db = DbManager::connect(&DbConfig::default()).await.unwrap();
    crm_db::run_migrations(db.client()).await.unwrap();
    router(AppState::new(
        db.client(),
        ConfiguredMailer::Memory(mailer),
        config,
    ))
}

async fn app_with_mailer(mailer: InMemoryMailer) -> Router {
    app_with(mailer, ServiceConfig::default()).await
}

async fn app() -> Router {
    app_with_mailer(InMemoryMailer::new()).await
}

async fn call(
    app: &Router,
    method: &str,
    uri: &str,
    caller: Option<&Caller>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(caller) = caller {
        builder = builder
            .header("x-organization-uuid", caller.org.to_string())
            .header("x-user-uuid", caller.user.to_string())
            .header("x-username", "Test User");
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

fn appointment_body(name: &str, day: u32) -> Value {
    json!({
        "name": name,
        "start_date": format!("2026-03-{day:02}T09:00:00Z"),
        "end_date": format!("2026-03-{day:02}T10:00:00Z"),
        "type": ["Visit"],
        "address": "Oderberger Straße 16A",
    })
}

#[tokio::test]
async fn health_is_ok() {
    let app = app().await;
    let (status, _) = call(&app, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn contact_crud() {
    let app = app().await;
    let caller = Caller::new();

    let (status, created) = call(
        &app,
        "POST",
        "/api/contacts",
        Some(&caller),
        Some(json!({ "first_name": "Ada", "last_name": "Lovelace" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["customer_id"], 10001);
    let id = created["id"].as_str().unwrap().to_string();
    let uri = format!("/api/contacts/{id}");

    let (status, patched) = call(
        &app,
        "PATCH",
        &uri,
        Some(&caller),
        Some(json!({ "company": "Analytical Engines" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(patched["company"], "Analytical Engines");
    assert_eq!(patched["first_name"], "Ada");

    let (status, page) = call(&app, "GET", "/api/contacts?limit=1", Some(&caller), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["count"], 1);
    assert!(page["next"].is_null());

    let (status, _) = call(&app, "DELETE", &uri, Some(&caller), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, body) = call(&app, "GET", &uri, Some(&caller), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["detail"].is_string());
}

#[tokio::test]
async fn validation_errors_name_the_field() {
    let app = app().await;
    let caller = Caller::new();

    let (status, body) = call(
        &app,
        "POST",
        "/api/contacts",
        Some(&caller),
        Some(json!({ "first_name": "" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["first_name"].is_array());

    let mut reversed = appointment_body("Backwards", 5);
    reversed["end_date"] = json!("2026-03-04T10:00:00Z");
    let (status, body) = call(&app, "POST", "/api/appointments", Some(&caller), Some(reversed)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["non_field_errors"].is_array());

    let mut untyped = appointment_body("Untyped", 5);
    untyped["type"] = json!([]);
    let (status, body) = call(&app, "POST", "/api/appointments", Some(&caller), Some(untyped)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["type"][0],
        "type must be an array of one or more string elements"
    );

    let (status, body) = call(
        &app,
        "POST",
        "/api/appointments",
        Some(&caller),
        Some(json!("not an object")),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["non_field_errors"].is_array());
}

#[tokio::test]
async fn duplicate_customer_id_is_a_conflict() {
    let app = app().await;
    let caller = Caller::new();
    let body = json!({ "first_name": "Ada", "customer_id": 42 });

    let (status, _) = call(&app, "POST", "/api/contacts", Some(&caller), Some(body.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, body) = call(&app, "POST", "/api/contacts", Some(&caller), Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["cause"].is_string());
}

#[tokio::test]
async fn access_follows_the_organization() {
    let app = app().await;
    let owner = Caller::new();

    let (_, created) = call(
        &app,
        "POST",
        "/api/appointments",
        Some(&owner),
        Some(appointment_body("Kickoff", 3)),
    )
    .await;
    let uri = format!("/api/appointments/{}", created["id"].as_str().unwrap());

    let (status, _) = call(&app, "GET", &uri, Some(&owner.colleague()), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = call(&app, "GET", &uri, Some(&Caller::new()), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body["detail"].is_string());

    let (status, _) = call(&app, "GET", &uri, None, None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let missing = format!("/api/appointments/{}", Uuid::new_v4());
    let (status, _) = call(&app, "GET", &missing, Some(&owner), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn appointment_pages_follow_next_links() {
    let app = app().await;
    let caller = Caller::new();
    for i in 0..32 {
        let (status, _) = call(
            &app,
            "POST",
            "/api/appointments",
            Some(&caller),
            Some(appointment_body(&format!("Slot {i}"), 1 + i % 28)),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, first) = call(&app, "GET", "/api/appointments", Some(&caller), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["results"].as_array().unwrap().len(), 30);
    assert!(first["previous"].is_null());

    let next = first["next"].as_str().unwrap().to_string();
    assert!(next.starts_with("/api/appointments?"));
    let (status, second) = call(&app, "GET", &next, Some(&caller), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["results"].as_array().unwrap().len(), 2);
    assert!(second["next"].is_null());
    assert!(second["previous"].is_string());

    let (status, body) = call(&app, "GET", "/api/appointments?owner=abc", Some(&caller), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["owner"].is_array());

    let (status, mine) = call(
        &app,
        "GET",
        "/api/appointments?owner=me&page_size=5",
        Some(&caller),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(mine["results"].as_array().unwrap().len(), 5);
}

#[tokio::test]
async fn appointment_notes_merge_by_type() {
    let app = app().await;
    let caller = Caller::new();

    let mut body = appointment_body("Survey", 9);
    body["notes"] = json!([{ "note": "bring ladder", "type": 1 }]);
    let (status, created) = call(&app, "POST", "/api/appointments", Some(&caller), Some(body)).await;
    assert_eq!(status, StatusCode::CREATED);
    let note_id = created["notes"][0]["id"].clone();
    let uri = format!("/api/appointments/{}", created["id"].as_str().unwrap());

    let (status, updated) = call(
        &app,
        "PUT",
        &uri,
        Some(&caller),
        Some(json!({ "notes": [{ "note": "bring two ladders", "type": 1 }] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["notes"].as_array().unwrap().len(), 1);
    assert_eq!(updated["notes"][0]["id"], note_id);
    assert_eq!(updated["notes"][0]["note"], "bring two ladders");

    let (status, body) = call(
        &app,
        "PATCH",
        &uri,
        Some(&caller),
        Some(json!({ "notes": [{ "type": 2 }, { "type": 2 }] })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["notes"][0], "every type is only allowed once");

    let (status, notes) = call(&app, "GET", "/api/appointment-notes", Some(&caller), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(notes.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn notification_is_mailed_once() {
    let mailer = InMemoryMailer::new();
    let app = app_with_mailer(mailer.clone()).await;
    let caller = Caller::new();

    let (_, appointment) = call(
        &app,
        "POST",
        "/api/appointments",
        Some(&caller),
        Some(appointment_body("Delivery", 12)),
    )
    .await;

    let (status, created) = call(
        &app,
        "POST",
        "/api/appointment-notifications",
        Some(&caller),
        Some(json!({
            "appointment": appointment["id"],
            "recipient": "customer@example.com",
            "org_name": "Test org",
            "send_notification": true,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(created["sent_at"].is_string());
    assert!(created["message"].as_str().unwrap().contains("Oderberger Straße 16A"));
    assert_eq!(mailer.outbox().len(), 1);

    let uri = format!(
        "/api/appointment-notifications/{}",
        created["id"].as_str().unwrap()
    );
    let (status, _) = call(
        &app,
        "PUT",
        &uri,
        Some(&caller),
        Some(json!({ "send_notification": true })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(mailer.outbox().len(), 1);

    let (status, body) = call(
        &app,
        "POST",
        "/api/appointment-notifications",
        Some(&caller),
        Some(json!({
            "appointment": Uuid::new_v4(),
            "recipient": "customer@example.com",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["appointment"][0].as_str().unwrap().starts_with("Invalid pk"));
}

#[tokio::test]
async fn driving_time_roundtrip() {
    let app = app().await;
    let caller = Caller::new();
    let (_, appointment) = call(
        &app,
        "POST",
        "/api/appointments",
        Some(&caller),
        Some(appointment_body("Far away", 20)),
    )
    .await;

    let (status, created) = call(
        &app,
        "POST",
        "/api/appointment-driving-times",
        Some(&caller),
        Some(json!({ "appointment": appointment["id"], "distance": 42.123 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["distance"], 42.12);

    let (status, list) = call(
        &app,
        "GET",
        "/api/appointment-driving-times",
        Some(&Caller::new()),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(list.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn large_appointment_pages_lift_the_ceiling() {
    let config = ServiceConfig {
        appointment_pages: CursorConfig::LARGE,
        ..ServiceConfig::default()
    };
    let app = app_with(InMemoryMailer::new(), config).await;
    let caller = Caller::new();

    for i in 0..101u32 {
        let body = appointment_body(&format!("Bulk {i}"), 1 + i % 28);
        let (status, _) = call(&app, "POST", "/api/appointments", Some(&caller), Some(body)).await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, page) = call(
        &app,
        "GET",
        "/api/appointments?page_size=500",
        Some(&caller),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["results"].as_array().unwrap().len(), 101);
    assert!(page["next"].is_null());
}

#[tokio::test]
async fn malformed_ids_are_structured_bad_requests() {
    let app = app().await;
    let caller = Caller::new();

    for uri in [
        "/api/contacts/not-a-uuid",
        "/api/appointments/42",
        "/api/appointment-notes/xyz",
    ] {
        let (status, body) = call(&app, "GET", uri, Some(&caller), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert!(body["non_field_errors"][0].is_string(), "{uri}: {body}");
    }

    let (status, body) = call(
        &app,
        "PATCH",
        "/api/contacts/not-a-uuid",
        Some(&caller),
        Some(json!({ "company": "Nowhere" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["non_field_errors"][0].is_string());
}
