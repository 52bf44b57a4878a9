//! Query-parameter filtering for list endpoints.
//!
//! Each list endpoint turns its raw `name -> value` query map into a typed
//! filter plus an [`Ordering`]. Malformed values fail with a validation
//! error naming the parameter; unknown parameters are ignored.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, Utc};
use uuid::Uuid;

use crate::error::{CrmError, CrmResult};
use crate::guard::list_scope;
use crate::identity::IdentityContext;

/// Raw query parameters of a list request.
pub type QueryParams = HashMap<String, String>;

/// Keyword standing for the caller's own user id.
pub const CURRENT_USER_KEYWORD: &str = "me";

// ---------------------------------------------------------------------------
// Ordering
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_sql(self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }

    pub fn reversed(self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }
}

/// A column a list can be ordered by.
pub trait SortField: Copy + Default + fmt::Debug {
    /// The accepted `ordering` values, without the `-` prefix.
    const ALLOWED: &'static [&'static str];

    fn parse(name: &str) -> Option<Self>;

    /// Column name in the store.
    fn column(self) -> &'static str;
}

/// A sort field plus direction. Ties are always broken by id ascending
/// in the same direction, so results are deterministic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Ordering<F> {
    pub field: F,
    pub direction: SortDirection,
}

impl<F: SortField> Ordering<F> {
    /// Parse an `ordering` parameter such as `-start_date`.
    pub fn parse(raw: Option<&str>) -> CrmResult<Self> {
        let Some(raw) = raw.map(str::trim).filter(|r| !r.is_empty()) else {
            return Ok(Self::default());
        };
        let (name, direction) = match raw.strip_prefix('-') {
            Some(name) => (name, SortDirection::Desc),
            None => (raw, SortDirection::Asc),
        };
        let field = F::parse(name).ok_or_else(|| {
            CrmError::validation(
                "ordering",
                format!(
                    "Select a valid choice. {raw} is not one of the available choices: {}.",
                    F::ALLOWED.join(", ")
                ),
            )
        })?;
        Ok(Self { field, direction })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AppointmentSortField {
    #[default]
    Id,
    StartDate,
    EndDate,
}

impl SortField for AppointmentSortField {
    const ALLOWED: &'static [&'static str] = &["id", "start_date", "end_date"];

    fn parse(name: &str) -> Option<Self> {
        match name {
            "id" => Some(Self::Id),
            "start_date" => Some(Self::StartDate),
            "end_date" => Some(Self::EndDate),
            _ => None,
        }
    }

    fn column(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::StartDate => "start_date",
            Self::EndDate => "end_date",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContactSortField {
    #[default]
    Id,
    FirstName,
    LastName,
    CustomerId,
}

impl SortField for ContactSortField {
    const ALLOWED: &'static [&'static str] = &["id", "first_name", "last_name", "customer_id"];

    fn parse(name: &str) -> Option<Self> {
        match name {
            "id" => Some(Self::Id),
            "first_name" => Some(Self::FirstName),
            "last_name" => Some(Self::LastName),
            "customer_id" => Some(Self::CustomerId),
            _ => None,
        }
    }

    fn column(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::FirstName => "first_name",
            Self::LastName => "last_name",
            Self::CustomerId => "customer_id",
        }
    }
}

// ---------------------------------------------------------------------------
// Appointments
// ---------------------------------------------------------------------------

/// Conjunctive appointment filter. `None` fields do not constrain.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppointmentFilter {
    /// Organization scope; `None` only for superusers without one.
    pub organization_id: Option<Uuid>,
    pub contact_uuid: Option<Uuid>,
    pub owner: Option<Uuid>,
    /// Matches appointments whose invitees contain this id.
    pub invitee: Option<Uuid>,
    pub workflowlevel2_uuid: Option<Uuid>,
    pub start_date_gte: Option<DateTime<Utc>>,
    pub start_date_lte: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppointmentQuery {
    pub filter: AppointmentFilter,
    pub ordering: Ordering<AppointmentSortField>,
    /// Embed the linked contact's name block into each result.
    pub denormalize: bool,
}

impl AppointmentQuery {
    pub fn from_params(params: &QueryParams, identity: &IdentityContext) -> CrmResult<Self> {
        let organization_id = list_scope(identity)?;
        let filter = AppointmentFilter {
            organization_id,
            contact_uuid: param(params, "contact_uuid")
                .map(|v| parse_uuid("contact_uuid", v, "Enter a valid UUID."))
                .transpose()?,
            owner: param(params, "owner")
                .map(|v| {
                    me_or_uuid(
                        "owner",
                        v,
                        identity,
                        "owner field can only have value \"me\" or a valid User UUID",
                    )
                })
                .transpose()?,
            invitee: param(params, "invitee")
                .map(|v| {
                    me_or_uuid(
                        "invitee",
                        v,
                        identity,
                        "invitee field can only have value \"me\" or a valid User UUID",
                    )
                })
                .transpose()?,
            workflowlevel2_uuid: param(params, "workflowlevel2_uuid")
                .map(|v| {
                    parse_uuid(
                        "workflowlevel2_uuid",
                        v,
                        "workflowlevel2_uuids field can only have a valid UUID",
                    )
                })
                .transpose()?,
            start_date_gte: param(params, "start_date_gte")
                .map(|v| parse_bound("start_date_gte", v, Bound::Lower))
                .transpose()?,
            start_date_lte: param(params, "start_date_lte")
                .map(|v| parse_bound("start_date_lte", v, Bound::Upper))
                .transpose()?,
        };
        Ok(Self {
            filter,
            ordering: Ordering::parse(param(params, "ordering"))?,
            denormalize: param(params, "denormalize").is_some_and(parse_flag),
        })
    }
}

// ---------------------------------------------------------------------------
// Contacts
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContactFilter {
    pub organization_id: Option<Uuid>,
    /// Matches contacts whose list contains at least one of these.
    pub workflowlevel2_uuids: Vec<Uuid>,
    pub siteprofile_uuids: Vec<Uuid>,
    /// Lowercased prefix of first or last name.
    pub starts_with: Option<String>,
    /// Lowercased substring of first or last name.
    pub search: Option<String>,
    pub contact_type: Option<Uuid>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContactQuery {
    pub filter: ContactFilter,
    pub ordering: Ordering<ContactSortField>,
}

impl ContactQuery {
    pub fn from_params(params: &QueryParams, identity: &IdentityContext) -> CrmResult<Self> {
        let filter = ContactFilter {
            organization_id: list_scope(identity)?,
            workflowlevel2_uuids: param(params, "workflowlevel2_uuids")
                .map(|v| parse_uuid_list("workflowlevel2_uuids", v))
                .transpose()?
                .unwrap_or_default(),
            siteprofile_uuids: param(params, "siteprofile_uuids")
                .map(|v| parse_uuid_list("siteprofile_uuids", v))
                .transpose()?
                .unwrap_or_default(),
            starts_with: param(params, "starts_with").map(str::to_lowercase),
            search: param(params, "search").map(str::to_lowercase),
            contact_type: param(params, "contact_type")
                .map(|v| parse_uuid("contact_type", v, "Enter a valid UUID."))
                .transpose()?,
        };
        Ok(Self {
            filter,
            ordering: Ordering::parse(param(params, "ordering"))?,
        })
    }
}

// ---------------------------------------------------------------------------
// Contact types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactTypeFilter {
    /// Organization whose own types are listed next to the global ones.
    pub organization_id: Option<Uuid>,
    /// List only global types.
    pub global_only: bool,
}

impl ContactTypeFilter {
    pub fn from_params(params: &QueryParams, identity: &IdentityContext) -> CrmResult<Self> {
        Ok(Self {
            organization_id: list_scope(identity)?,
            global_only: param(params, "is_global").is_some_and(parse_flag),
        })
    }
}

// ---------------------------------------------------------------------------
// Parameter parsing
// ---------------------------------------------------------------------------

/// A non-empty parameter value.
fn param<'a>(params: &'a QueryParams, name: &str) -> Option<&'a str> {
    params
        .get(name)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
}

/// `true`, `yes`, `t` and `1` in any case are true; everything else false.
pub fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "yes" | "t" | "1"
    )
}

fn parse_uuid(field: &str, value: &str, message: &str) -> CrmResult<Uuid> {
    Uuid::parse_str(value).map_err(|_| CrmError::validation(field, message))
}

fn me_or_uuid(
    field: &str,
    value: &str,
    identity: &IdentityContext,
    message: &str,
) -> CrmResult<Uuid> {
    if value == CURRENT_USER_KEYWORD {
        return identity
            .user_id
            .ok_or_else(|| CrmError::validation(field, message));
    }
    parse_uuid(field, value, message)
}

fn parse_uuid_list(field: &str, value: &str) -> CrmResult<Vec<Uuid>> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| {
            Uuid::parse_str(item).map_err(|_| {
                CrmError::validation(field, format!("'{item}' is not a valid UUID."))
            })
        })
        .collect()
}

#[derive(Debug, Clone, Copy)]
enum Bound {
    Lower,
    Upper,
}

/// Parse a timestamp bound. Bare dates widen to the whole day.
fn parse_bound(field: &str, value: &str, bound: Bound) -> CrmResult<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Ok(ts.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S") {
        return Ok(naive.and_utc());
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S") {
        return Ok(naive.and_utc());
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        let midnight = date.and_time(NaiveTime::MIN).and_utc();
        return Ok(match bound {
            Bound::Lower => midnight,
            Bound::Upper => midnight + TimeDelta::days(1) - TimeDelta::nanoseconds(1),
        });
    }
    Err(CrmError::validation(field, "Enter a valid date/time."))
}
