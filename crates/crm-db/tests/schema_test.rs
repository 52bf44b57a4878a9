//! Integration tests for schema initialization using in-memory SurrealDB.

use surrealdb::Surreal;
use surrealdb::engine::local::Mem;

async fn fresh() -> Surreal<surrealdb::engine::local::Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    db
}

#[tokio::test]
async fn schema_migration_applies_successfully() {
    let db = fresh().await;

    let applied = crm_db::run_migrations(&db).await.unwrap();
    assert_eq!(applied, 2);

    let mut result = db.query("INFO FOR DB").await.unwrap();
    let info: Option<surrealdb_types::Value> = result.take(0).unwrap();
    let info = info.expect("INFO FOR DB should return a value");
    let info_str = format!("{:?}", info);

    for table in [
        "contact",
        "contact_type",
        "appointment",
        "appointment_note",
        "appointment_notification",
        "appointment_driving_time",
        "has_note",
        "_migration",
    ] {
        assert!(info_str.contains(table), "missing {table} table");
    }
}

#[tokio::test]
async fn migration_is_idempotent() {
    let db = fresh().await;

    crm_db::run_migrations(&db).await.unwrap();
    let second = crm_db::run_migrations(&db).await.unwrap();
    assert_eq!(second, 0);

    let mut result = db.query("SELECT * FROM _migration").await.unwrap();
    let records: Vec<surrealdb_types::Value> = result.take(0).unwrap();
    assert_eq!(records.len(), 2, "expected one record per migration");
}

#[tokio::test]
async fn unique_index_rejects_duplicate_customer_id() {
    let db = fresh().await;
    crm_db::run_migrations(&db).await.unwrap();

    let insert = "CREATE contact SET organization_id = 'org-a', user_id = 'u', \
                  first_name = 'David', customer_id = 10001";
    db.query(insert).await.unwrap().check().unwrap();

    let duplicate = db.query(insert).await.unwrap().check();
    assert!(duplicate.is_err(), "duplicate customer_id should be rejected");

    // Same number in another organization is fine.
    db.query(
        "CREATE contact SET organization_id = 'org-b', user_id = 'u', \
         first_name = 'Nina', customer_id = 10001",
    )
    .await
    .unwrap()
    .check()
    .unwrap();
}

#[tokio::test]
async fn note_type_is_asserted() {
    let db = fresh().await;
    crm_db::run_migrations(&db).await.unwrap();

    let result = db
        .query("CREATE appointment_note SET note = 'x', note_type = 9")
        .await
        .unwrap()
        .check();
    assert!(result.is_err(), "note type outside 1..=4 should be rejected");
}
