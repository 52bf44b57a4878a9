//! CRM Server: The axum HTTP front end.
//!
//! Handlers translate requests into service calls: the caller identity
//! comes from headers set by the upstream auth collaborator, query
//! strings become filter and paging parameters, and [`CrmError`]s become
//! JSON error bodies.
//!
//! [`CrmError`]: crm_core::error::CrmError

pub mod config;
pub mod error;
pub mod extract;
pub mod http;
pub mod state;

pub use config::ServerConfig;
pub use http::router;
pub use state::{AppState, ConfiguredMailer};
