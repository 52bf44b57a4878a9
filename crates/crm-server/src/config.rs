//! Server configuration, read from the environment.

use std::env;

use crm_core::pagination::CursorConfig;
use crm_db::DbConfig;
use crm_service::ServiceConfig;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}

/// Which mail collaborator the server hands notifications to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MailerKind {
    /// Write every mail to the log.
    #[default]
    Log,
    /// Keep mails in memory; for local runs.
    Memory,
}

impl MailerKind {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "log" => Some(Self::Log),
            "memory" => Some(Self::Memory),
            _ => None,
        }
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Everything the binary needs to start.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Listen address (default: `0.0.0.0:8080`).
    pub http_addr: String,
    pub db: DbConfig,
    pub service: ServiceConfig,
    pub mailer: MailerKind,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: "0.0.0.0:8080".into(),
            db: DbConfig::default(),
            service: ServiceConfig::default(),
            mailer: MailerKind::default(),
        }
    }
}

impl ServerConfig {
    /// Read `CRM_*` variables, falling back to defaults for unset ones.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let set = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(addr) = set("CRM_HTTP_ADDR") {
            config.http_addr = addr;
        }
        if let Some(url) = set("CRM_DB_URL") {
            config.db.url = url;
        }
        if let Some(namespace) = set("CRM_DB_NAMESPACE") {
            config.db.namespace = namespace;
        }
        if let Some(database) = set("CRM_DB_DATABASE") {
            config.db.database = database;
        }
        config.db.username = set("CRM_DB_USERNAME");
        config.db.password = set("CRM_DB_PASSWORD");
        if let Some(from) = set("CRM_MAIL_FROM") {
            config.service.mail_from = from;
        }
        if let Some(large) = set("CRM_LARGE_APPOINTMENT_PAGES") {
            let large = parse_flag(&large).ok_or(ConfigError::Invalid {
                key: "CRM_LARGE_APPOINTMENT_PAGES",
                value: large,
            })?;
            if large {
                config.service.appointment_pages = CursorConfig::LARGE;
            }
        }
        if let Some(mailer) = set("CRM_MAILER") {
            config.mailer = MailerKind::parse(&mailer).ok_or(ConfigError::Invalid {
                key: "CRM_MAILER",
                value: mailer,
            })?;
        }
        Ok(config)
    }
}
