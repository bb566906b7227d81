//! Shared building blocks for filtered list queries
//!
//! Every list operation composes its WHERE clause the same way: start from a
//! boxed query, add one condition per filter that is present, and finish with
//! the table's ordering and a [`Page`]. Absent filters add nothing.

use diesel::sql_types::Text;
use diesel::sqlite::SqliteConnection;
use diesel::QueryResult;
use serde::{Deserialize, Serialize};

use crate::error::ArchiveError;

diesel::define_sql_function! {
    /// Unicode lowercase of a text column. SQLite's own `lower` and `LIKE`
    /// only fold ASCII.
    fn fold_case(x: Text) -> Text;
}

/// Register the functions every pooled connection needs
pub fn register_functions(conn: &mut SqliteConnection) -> QueryResult<()> {
    fold_case_utils::register_impl(conn, |s: String| s.to_lowercase())
}

/// Character used to escape LIKE metacharacters
pub const LIKE_ESCAPE: char = '\\';

/// Limit/offset window for a list query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub limit: i64,
    pub offset: i64,
}

impl Page {
    /// Validate a requested window, capping `limit` at `max_limit`
    pub fn new(limit: i64, offset: i64, max_limit: i64) -> Result<Self, ArchiveError> {
        if limit < 1 {
            return Err(ArchiveError::InvalidInput(format!(
                "limit must be at least 1, got {}",
                limit
            )));
        }
        if offset < 0 {
            return Err(ArchiveError::InvalidInput(format!(
                "offset must not be negative, got {}",
                offset
            )));
        }
        Ok(Self {
            limit: limit.min(max_limit),
            offset,
        })
    }

    /// Resolve optional request values against configured defaults
    pub fn from_request(
        limit: Option<i64>,
        offset: Option<i64>,
        default_limit: i64,
        max_limit: i64,
    ) -> Result<Self, ArchiveError> {
        Self::new(
            limit.unwrap_or(default_limit),
            offset.unwrap_or(0),
            max_limit,
        )
    }

    /// First `limit` rows
    pub fn first(limit: i64) -> Self {
        Self { limit, offset: 0 }
    }
}

impl Default for Page {
    fn default() -> Self {
        Self {
            limit: 20,
            offset: 0,
        }
    }
}

/// Normalize a free-text search: blank input means "no search"
pub fn search_term(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|s| !s.is_empty())
}

/// Escape `%`, `_` and the escape character so the input matches literally
pub fn escape_like(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if c == '%' || c == '_' || c == LIKE_ESCAPE {
            escaped.push(LIKE_ESCAPE);
        }
        escaped.push(c);
    }
    escaped
}

/// Lowercased, escaped substring pattern, matched against `fold_case(column)`
pub fn contains_pattern(raw: &str) -> String {
    format!("%{}%", escape_like(&raw.to_lowercase()))
}

/// Lowercased, escaped whole-value pattern, matched against `fold_case(column)`
pub fn exact_pattern(raw: &str) -> String {
    escape_like(&raw.to_lowercase())
}
