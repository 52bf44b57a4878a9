//! Opening the SurrealDB client.
//!
//! The endpoint scheme picks the engine: `mem://` runs embedded (local
//! development and tests), `ws://` or `http://` talk to a server.

use surrealdb::Surreal;
use surrealdb::engine::any::{self, Any};
use surrealdb::opt::auth::Root;
use tracing::{debug, info};

/// Where the CRM data lives.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Endpoint, e.g. `mem://` or `ws://127.0.0.1:8000`.
    pub url: String,
    pub namespace: String,
    pub database: String,
    /// Root sign-in; skipped unless both are set.
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            url: "mem://".into(),
            namespace: "crm".into(),
            database: "main".into(),
            username: None,
            password: None,
        }
    }
}

impl DbConfig {
    fn root_credentials(&self) -> Option<Root> {
        match (&self.username, &self.password) {
            (Some(username), Some(password)) => Some(Root {
                username: username.clone(),
                password: password.clone(),
            }),
            _ => None,
        }
    }
}

/// Owns the client every repository is built from.
#[derive(Clone)]
pub struct DbManager {
    db: Surreal<Any>,
}

impl DbManager {
    /// Open the endpoint, sign in if configured and select the
    /// namespace and database.
    pub async fn connect(config: &DbConfig) -> Result<Self, surrealdb::Error> {
        info!(
            url = %config.url,
            namespace = %config.namespace,
            database = %config.database,
            "Opening CRM store"
        );

        let db = any::connect(config.url.as_str()).await?;
        if let Some(root) = config.root_credentials() {
            db.signin(root).await?;
            debug!("Signed in as root");
        }
        db.use_ns(&config.namespace)
            .use_db(&config.database)
            .await?;

        info!("CRM store ready");
        Ok(Self { db })
    }

    pub fn client(&self) -> &Surreal<Any> {
        &self.db
    }
}
