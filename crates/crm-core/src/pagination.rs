//! Cursor and limit/offset pagination.
//!
//! Appointments page through an opaque keyset cursor; contacts use plain
//! limit/offset with a total count. Both rely on a stable sort of
//! `(sort key, id)`.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{CrmError, CrmResult};
use crate::filter::QueryParams;
use crate::repository::Pagination;

pub const CURSOR_PARAM: &str = "cursor";
pub const PAGE_SIZE_PARAM: &str = "page_size";
pub const LIMIT_PARAM: &str = "limit";
pub const OFFSET_PARAM: &str = "offset";

// ---------------------------------------------------------------------------
// Cursor
// ---------------------------------------------------------------------------

/// Position of the record a page starts after (or, reversed, before).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cursor {
    /// Sort key of the boundary record; absent when ordering by id.
    #[serde(rename = "k", default, skip_serializing_if = "Option::is_none")]
    pub key: Option<DateTime<Utc>>,
    #[serde(rename = "i")]
    pub id: Uuid,
    /// Walk towards the start of the list instead of the end.
    #[serde(rename = "r", default)]
    pub reverse: bool,
}

impl Cursor {
    pub fn encode(&self) -> String {
        // Serializing a plain struct of strings and bools cannot fail.
        let json = serde_json::to_vec(self).unwrap_or_default();
        URL_SAFE_NO_PAD.encode(json)
    }

    pub fn decode(token: &str) -> CrmResult<Self> {
        let invalid = || CrmError::validation(CURSOR_PARAM, "Invalid cursor");
        let bytes = URL_SAFE_NO_PAD.decode(token.trim()).map_err(|_| invalid())?;
        serde_json::from_slice(&bytes).map_err(|_| invalid())
    }
}

/// Records that can be addressed by a [`Cursor`].
pub trait CursorKeyed {
    fn cursor_id(&self) -> Uuid;
}

/// Page size bounds of a cursor-paginated list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CursorConfig {
    pub default_page_size: usize,
    pub max_page_size: usize,
}

impl CursorConfig {
    pub const DEFAULT: CursorConfig = CursorConfig {
        default_page_size: 30,
        max_page_size: 100,
    };

    /// For bulk listings such as calendar exports.
    pub const LARGE: CursorConfig = CursorConfig {
        default_page_size: 30,
        max_page_size: 2000,
    };
}

impl Default for CursorConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// A cursor page request parsed from query parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CursorRequest {
    pub cursor: Option<Cursor>,
    pub page_size: usize,
}

impl CursorRequest {
    /// Read `cursor` and `page_size`. A missing or malformed page size
    /// falls back to the default; larger ones are clamped.
    pub fn from_params(params: &QueryParams, config: CursorConfig) -> CrmResult<Self> {
        let cursor = params
            .get(CURSOR_PARAM)
            .filter(|c| !c.trim().is_empty())
            .map(|c| Cursor::decode(c))
            .transpose()?;
        let page_size = params
            .get(PAGE_SIZE_PARAM)
            .and_then(|v| v.trim().parse::<usize>().ok())
            .filter(|&n| n > 0)
            .map_or(config.default_page_size, |n| n.min(config.max_page_size));
        Ok(Self { cursor, page_size })
    }

    /// How many rows the store has to return so the page can tell
    /// whether another one follows.
    pub fn fetch_size(&self) -> usize {
        self.page_size + 1
    }

    pub fn is_reverse(&self) -> bool {
        self.cursor.as_ref().is_some_and(|c| c.reverse)
    }
}

/// One page of a cursor-paginated list, with links.
#[derive(Debug, Clone, Serialize)]
pub struct CursorPage<T> {
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

impl<T> CursorPage<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> CursorPage<U> {
        CursorPage {
            next: self.next,
            previous: self.previous,
            results: self.results.into_iter().map(f).collect(),
        }
    }
}

/// Turn the rows fetched for `request` into a page.
///
/// `rows` are in walking order: ascending through the list for forward
/// cursors, descending for reverse ones, and hold at most
/// [`CursorRequest::fetch_size`] entries. `key_of` extracts the sort key
/// stored in the cursor.
pub fn build_cursor_page<T, K>(
    mut rows: Vec<T>,
    request: &CursorRequest,
    base_url: &str,
    key_of: K,
) -> CursorPage<T>
where
    T: CursorKeyed,
    K: Fn(&T) -> Option<DateTime<Utc>>,
{
    let has_more = rows.len() > request.page_size;
    rows.truncate(request.page_size);

    let position = |row: &T, reverse: bool| Cursor {
        key: key_of(row),
        id: row.cursor_id(),
        reverse,
    };

    let (next, previous) = if request.is_reverse() {
        rows.reverse();
        let next = rows.last().map(|row| position(row, false));
        let previous = if has_more {
            rows.first().map(|row| position(row, true))
        } else {
            None
        };
        (next, previous)
    } else {
        let next = if has_more {
            rows.last().map(|row| position(row, false))
        } else {
            None
        };
        let previous = match request.cursor {
            Some(_) => rows.first().map(|row| position(row, true)),
            None => None,
        };
        (next, previous)
    };

    CursorPage {
        next: next.map(|c| with_query_param(base_url, CURSOR_PARAM, Some(&c.encode()))),
        previous: previous.map(|c| with_query_param(base_url, CURSOR_PARAM, Some(&c.encode()))),
        results: rows,
    }
}

// ---------------------------------------------------------------------------
// Limit / offset
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LimitOffset {
    pub limit: u64,
    pub offset: u64,
}

impl LimitOffset {
    pub const DEFAULT_LIMIT: u64 = 50;
    pub const MAX_LIMIT: u64 = 7000;
    /// Largest offset the store accepts as a signed start position.
    pub const MAX_OFFSET: u64 = i64::MAX as u64;

    pub fn from_params(params: &QueryParams) -> Self {
        let limit = params
            .get(LIMIT_PARAM)
            .and_then(|v| v.trim().parse::<u64>().ok())
            .filter(|&n| n > 0)
            .map_or(Self::DEFAULT_LIMIT, |n| n.min(Self::MAX_LIMIT));
        let offset = params
            .get(OFFSET_PARAM)
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map_or(0, |n| n.min(Self::MAX_OFFSET));
        Self { limit, offset }
    }
}

impl Default for LimitOffset {
    fn default() -> Self {
        Self {
            limit: Self::DEFAULT_LIMIT,
            offset: 0,
        }
    }
}

impl From<LimitOffset> for Pagination {
    fn from(page: LimitOffset) -> Self {
        Pagination {
            offset: page.offset,
            limit: page.limit,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LimitOffsetPage<T> {
    pub count: u64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

impl<T> LimitOffsetPage<T> {
    pub fn new(results: Vec<T>, count: u64, page: LimitOffset, base_url: &str) -> Self {
        let end = page.offset.saturating_add(page.limit);
        let next = (end < count).then(|| {
            let url = with_query_param(base_url, LIMIT_PARAM, Some(&page.limit.to_string()));
            with_query_param(&url, OFFSET_PARAM, Some(&end.to_string()))
        });
        let previous = (page.offset > 0).then(|| {
            let url = with_query_param(base_url, LIMIT_PARAM, Some(&page.limit.to_string()));
            if page.offset <= page.limit {
                with_query_param(&url, OFFSET_PARAM, None)
            } else {
                with_query_param(
                    &url,
                    OFFSET_PARAM,
                    Some(&(page.offset - page.limit).to_string()),
                )
            }
        });
        Self {
            count,
            next,
            previous,
            results,
        }
    }
}

// ---------------------------------------------------------------------------
// URLs
// ---------------------------------------------------------------------------

/// Replace (or with `None`, drop) a query parameter of `url`, keeping the
/// other parameters in their original order.
pub fn with_query_param(url: &str, key: &str, value: Option<&str>) -> String {
    let (path, query) = url.split_once('?').unwrap_or((url, ""));
    let mut pairs: Vec<String> = query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .filter(|pair| pair.split('=').next() != Some(key))
        .map(str::to_string)
        .collect();
    if let Some(value) = value {
        pairs.push(format!("{key}={value}"));
    }
    if pairs.is_empty() {
        path.to_string()
    } else {
        format!("{path}?{}", pairs.join("&"))
    }
}
