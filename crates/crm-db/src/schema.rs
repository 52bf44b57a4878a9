//! Schema definitions and migration runner for SurrealDB.
//!
//! All tables are SCHEMAFULL. UUIDs are stored as strings; the record
//! key of every row is its UUID. Enumerations are stored as strings (note
//! types as their integer code) guarded by ASSERT clauses. Contact
//! sub-records (addresses, phones, e-mails) are stored as flexible
//! objects and validated before they reach the store.

use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::info;

use crate::error::DbError;

// -----------------------------------------------------------------------
// Migration tracking
// -----------------------------------------------------------------------

const MIGRATION_TABLE_DDL: &str = "\
DEFINE TABLE IF NOT EXISTS _migration SCHEMAFULL;
DEFINE FIELD IF NOT EXISTS version ON TABLE _migration TYPE int;
DEFINE FIELD IF NOT EXISTS name ON TABLE _migration TYPE string;
DEFINE FIELD IF NOT EXISTS applied_at ON TABLE _migration TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX IF NOT EXISTS idx_migration_version ON TABLE _migration \
    COLUMNS version UNIQUE;
";

#[derive(Debug, SurrealValue)]
struct MigrationRecord {
    version: u32,
    #[allow(dead_code)]
    name: String,
}

struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

static MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "initial_schema",
        sql: SCHEMA_V1,
    },
    Migration {
        version: 2,
        name: "contact_name_indexes",
        sql: SCHEMA_V2,
    },
];

// -----------------------------------------------------------------------
// Schema v1: initial table definitions
// -----------------------------------------------------------------------

const SCHEMA_V1: &str = "\
-- =======================================================================
-- Contact types (organization scope, optionally global)
-- =======================================================================
DEFINE TABLE contact_type SCHEMAFULL;
DEFINE FIELD organization_id ON TABLE contact_type TYPE string;
DEFINE FIELD name ON TABLE contact_type TYPE string;
DEFINE FIELD is_global ON TABLE contact_type TYPE bool DEFAULT false;
DEFINE FIELD created_at ON TABLE contact_type TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE contact_type TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_contact_type_org ON TABLE contact_type \
    COLUMNS organization_id;

-- =======================================================================
-- Contacts (organization scope)
-- =======================================================================
DEFINE TABLE contact SCHEMAFULL;
DEFINE FIELD organization_id ON TABLE contact TYPE string;
DEFINE FIELD user_id ON TABLE contact TYPE string;
DEFINE FIELD first_name ON TABLE contact TYPE string;
DEFINE FIELD middle_name ON TABLE contact TYPE option<string>;
DEFINE FIELD last_name ON TABLE contact TYPE string DEFAULT '';
DEFINE FIELD title ON TABLE contact TYPE option<string> \
    ASSERT $value = NONE OR $value IN ['mr', 'ms', 'mrs', 'miss', 'family'];
DEFINE FIELD suffix ON TABLE contact TYPE option<string>;
DEFINE FIELD contact_type ON TABLE contact TYPE option<string>;
DEFINE FIELD customer_type ON TABLE contact TYPE option<string> \
    ASSERT $value = NONE OR $value IN ['customer', 'company', 'public'];
DEFINE FIELD company ON TABLE contact TYPE option<string>;
DEFINE FIELD addresses ON TABLE contact TYPE array DEFAULT [];
DEFINE FIELD addresses.* ON TABLE contact TYPE object FLEXIBLE;
DEFINE FIELD emails ON TABLE contact TYPE array DEFAULT [];
DEFINE FIELD emails.* ON TABLE contact TYPE object FLEXIBLE;
DEFINE FIELD phones ON TABLE contact TYPE array DEFAULT [];
DEFINE FIELD phones.* ON TABLE contact TYPE object FLEXIBLE;
DEFINE FIELD siteprofile_uuids ON TABLE contact TYPE array DEFAULT [];
DEFINE FIELD siteprofile_uuids.* ON TABLE contact TYPE string;
DEFINE FIELD workflowlevel1_uuids ON TABLE contact TYPE array DEFAULT [];
DEFINE FIELD workflowlevel1_uuids.* ON TABLE contact TYPE string;
DEFINE FIELD workflowlevel2_uuids ON TABLE contact TYPE array DEFAULT [];
DEFINE FIELD workflowlevel2_uuids.* ON TABLE contact TYPE string;
DEFINE FIELD notes ON TABLE contact TYPE option<string>;
DEFINE FIELD customer_id ON TABLE contact TYPE int;
DEFINE FIELD created_at ON TABLE contact TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE contact TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_contact_org_customer_id ON TABLE contact \
    COLUMNS organization_id, customer_id UNIQUE;

-- =======================================================================
-- Appointments (organization scope)
-- =======================================================================
DEFINE TABLE appointment SCHEMAFULL;
DEFINE FIELD organization_id ON TABLE appointment TYPE string;
DEFINE FIELD owner ON TABLE appointment TYPE string;
DEFINE FIELD name ON TABLE appointment TYPE string;
DEFINE FIELD start_date ON TABLE appointment TYPE datetime;
DEFINE FIELD end_date ON TABLE appointment TYPE datetime;
DEFINE FIELD types ON TABLE appointment TYPE array;
DEFINE FIELD types.* ON TABLE appointment TYPE string;
DEFINE FIELD address ON TABLE appointment TYPE string DEFAULT '';
DEFINE FIELD siteprofile_uuid ON TABLE appointment TYPE option<string>;
DEFINE FIELD contact_uuid ON TABLE appointment TYPE option<string>;
DEFINE FIELD invitee_uuids ON TABLE appointment TYPE array DEFAULT [];
DEFINE FIELD invitee_uuids.* ON TABLE appointment TYPE string;
DEFINE FIELD workflowlevel2_uuids ON TABLE appointment TYPE array \
    DEFAULT [];
DEFINE FIELD workflowlevel2_uuids.* ON TABLE appointment TYPE string;
DEFINE FIELD created_at ON TABLE appointment TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE appointment TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_appointment_org_start ON TABLE appointment \
    COLUMNS organization_id, start_date;

-- =======================================================================
-- Appointment notes (attached through has_note)
-- =======================================================================
DEFINE TABLE appointment_note SCHEMAFULL;
DEFINE FIELD note ON TABLE appointment_note TYPE string DEFAULT '';
DEFINE FIELD note_type ON TABLE appointment_note TYPE int \
    ASSERT $value IN [1, 2, 3, 4];

-- =======================================================================
-- Appointment notifications (appointment scope)
-- =======================================================================
DEFINE TABLE appointment_notification SCHEMAFULL;
DEFINE FIELD appointment_id ON TABLE appointment_notification \
    TYPE string;
DEFINE FIELD subject ON TABLE appointment_notification \
    TYPE option<string>;
DEFINE FIELD message ON TABLE appointment_notification \
    TYPE option<string>;
DEFINE FIELD recipient ON TABLE appointment_notification TYPE string;
DEFINE FIELD org_phone ON TABLE appointment_notification \
    TYPE option<string>;
DEFINE FIELD org_name ON TABLE appointment_notification \
    TYPE option<string>;
DEFINE FIELD sent_at ON TABLE appointment_notification \
    TYPE option<datetime>;
DEFINE FIELD send_notification ON TABLE appointment_notification \
    TYPE bool DEFAULT false;
DEFINE INDEX idx_notification_appointment \
    ON TABLE appointment_notification COLUMNS appointment_id;

-- =======================================================================
-- Appointment driving times (appointment scope)
-- =======================================================================
DEFINE TABLE appointment_driving_time SCHEMAFULL;
DEFINE FIELD appointment_id ON TABLE appointment_driving_time \
    TYPE string;
DEFINE FIELD distance ON TABLE appointment_driving_time \
    TYPE option<float>;
DEFINE FIELD time ON TABLE appointment_driving_time TYPE option<int>;
DEFINE FIELD measured_at ON TABLE appointment_driving_time \
    TYPE datetime DEFAULT time::now();
DEFINE INDEX idx_driving_time_appointment \
    ON TABLE appointment_driving_time COLUMNS appointment_id;

-- =======================================================================
-- Graph Edge Tables (relations)
-- =======================================================================

-- Appointment -> Note attachment
DEFINE TABLE has_note TYPE RELATION SCHEMAFULL;
DEFINE FIELD created_at ON TABLE has_note TYPE datetime \
    DEFAULT time::now();
";

// -----------------------------------------------------------------------
// Schema v2: indexes backing contact name ordering and prefix search
// -----------------------------------------------------------------------

const SCHEMA_V2: &str = "\
DEFINE INDEX idx_contact_org_last_name ON TABLE contact \
    COLUMNS organization_id, last_name;
DEFINE INDEX idx_contact_org_first_name ON TABLE contact \
    COLUMNS organization_id, first_name;
DEFINE INDEX idx_has_note_out ON TABLE has_note COLUMNS out;
";

// -----------------------------------------------------------------------
// Public API
// -----------------------------------------------------------------------

/// Run all pending migrations against the given SurrealDB client.
///
/// Creates a `_migration` tracking table on first run, then applies
/// each migration whose version exceeds the current maximum. Returns the
/// number of migrations applied.
pub async fn run_migrations<C: Connection>(db: &Surreal<C>) -> Result<usize, DbError> {
    // Ensure migration tracking table exists (idempotent).
    db.query(MIGRATION_TABLE_DDL)
        .await?
        .check()
        .map_err(|e| DbError::Migration(e.to_string()))?;

    // Determine current schema version.
    let mut result = db
        .query("SELECT * FROM _migration ORDER BY version DESC LIMIT 1")
        .await?;
    let records: Vec<MigrationRecord> = result.take(0)?;
    let current_version = records.first().map(|m| m.version).unwrap_or(0);
    let mut applied = 0;

    for migration in MIGRATIONS {
        if migration.version > current_version {
            info!(
                version = migration.version,
                name = migration.name,
                "Applying migration"
            );
            db.query(migration.sql).await?.check().map_err(|e| {
                DbError::Migration(format!(
                    "Migration v{} '{}' failed: {}",
                    migration.version, migration.name, e,
                ))
            })?;

            // Record the applied migration.
            db.query(
                "CREATE _migration SET version = $version, \
                 name = $name",
            )
            .bind(("version", migration.version))
            .bind(("name", migration.name))
            .await?
            .check()
            .map_err(|e| {
                DbError::Migration(format!(
                    "Failed to record migration v{}: {}",
                    migration.version, e,
                ))
            })?;

            applied += 1;
            info!(
                version = migration.version,
                "Migration applied successfully"
            );
        }
    }

    if applied == 0 {
        info!(version = current_version, "Schema is up to date");
    }

    Ok(applied)
}

/// Returns the raw schema DDL for version 1.
///
/// Exposed for testing with in-memory SurrealDB instances that
/// bypass the migration runner.
pub fn schema_v1() -> &'static str {
    SCHEMA_V1
}
