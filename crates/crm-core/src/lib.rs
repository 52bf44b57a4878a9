//! CRM Core: Domain models, errors, repository traits and the request
//! logic that sits between the HTTP layer and the store.
//!
//! - [`filter`] turns query parameters into typed, validated filters.
//! - [`guard`] decides per-record access for single-object operations.
//! - [`notes`] merges incoming appointment notes into existing ones.
//! - [`pagination`] implements cursor and limit/offset paging.

pub mod error;
pub mod filter;
pub mod guard;
pub mod identity;
pub mod models;
pub mod notes;
pub mod pagination;
pub mod repository;
pub mod validation;

pub use error::{CrmError, CrmResult};
pub use identity::IdentityContext;
