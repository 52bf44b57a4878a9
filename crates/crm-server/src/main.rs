//! CRM Server: Application entry point.

use std::process::ExitCode;

use crm_db::DbManager;
use crm_server::{AppState, ConfiguredMailer, ServerConfig, router};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_DIRECTIVE: &str = "crm=info";

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(DEFAULT_LOG_DIRECTIVE))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).json().init();
}

#[tokio::main]
async fn main() -> ExitCode {
    // A missing .env file is fine; the environment may be set directly.
    let dotenv = dotenvy::dotenv();
    init_tracing();
    match dotenv {
        Err(e) if !e.not_found() => {
            error!(error = %e, "Failed to load .env file");
            return ExitCode::FAILURE;
        }
        _ => {}
    }

    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    info!("Starting CRM server...");

    let db = match DbManager::connect(&config.db).await {
        Ok(db) => db,
        Err(e) => {
            error!(error = %e, "Failed to connect to SurrealDB");
            return ExitCode::FAILURE;
        }
    };
    match crm_db::run_migrations(db.client()).await {
        Ok(applied) => info!(applied, "Schema migrations complete"),
        Err(e) => {
            error!(error = %e, "Schema migration failed");
            return ExitCode::FAILURE;
        }
    }

    let mailer = ConfiguredMailer::from_kind(config.mailer);
    let app = router(AppState::new(db.client(), mailer, config.service));

    let listener = match tokio::net::TcpListener::bind(&config.http_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(addr = %config.http_addr, error = %e, "Failed to bind HTTP listener");
            return ExitCode::FAILURE;
        }
    };
    info!(addr = %config.http_addr, "Listening");

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await;
    if let Err(e) = served {
        error!(error = %e, "HTTP server crashed");
        return ExitCode::FAILURE;
    }

    info!("CRM server stopped.");
    ExitCode::SUCCESS
}
