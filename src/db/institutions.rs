//! Institution operations using Diesel

use diesel::prelude::*;
use diesel::sqlite::Sqlite;
use serde::Deserialize;

use super::diesel_schema::institutions;
use super::models::{current_timestamp, Institution, NewInstitution};
use super::query::{contains_pattern, exact_pattern, fold_case, search_term, Page, LIKE_ESCAPE};
use crate::error::ArchiveError;

// ============================================================================
// Query Types
// ============================================================================

/// Input for creating an institution
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateInstitutionInput {
    pub name: String,
    #[serde(rename = "type")]
    pub institution_type: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub established_year: Option<i32>,
    #[serde(default)]
    pub total_students: Option<i32>,
    #[serde(default)]
    pub total_faculty: Option<i32>,
}

/// Query parameters for listing institutions
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InstitutionQuery {
    /// Case-insensitive substring of the name; blank means no search
    #[serde(default)]
    pub search: Option<String>,
    /// Case-insensitive match on the whole type value
    #[serde(default, rename = "type")]
    pub institution_type: Option<String>,
    #[serde(default)]
    pub limit: Option<i64>,
    #[serde(default)]
    pub offset: Option<i64>,
}

// ============================================================================
// Read Operations
// ============================================================================

/// Compose the WHERE clause for an institution listing
pub fn filtered(query: &InstitutionQuery) -> institutions::BoxedQuery<'static, Sqlite> {
    let mut base_query = institutions::table.into_boxed();

    if let Some(term) = search_term(query.search.as_deref()) {
        base_query = base_query.filter(
            fold_case(institutions::name)
                .like(contains_pattern(term))
                .escape(LIKE_ESCAPE),
        );
    }

    if let Some(kind) = search_term(query.institution_type.as_deref()) {
        base_query = base_query.filter(
            fold_case(institutions::institution_type)
                .like(exact_pattern(kind))
                .escape(LIKE_ESCAPE),
        );
    }

    base_query
}

/// Get institution by ID
pub fn get_institution(
    conn: &mut SqliteConnection,
    id: i32,
) -> Result<Option<Institution>, ArchiveError> {
    institutions::table
        .find(id)
        .select(Institution::as_select())
        .first(conn)
        .optional()
        .map_err(|e| ArchiveError::query("Institution lookup failed", e))
}

/// Check whether an institution exists
pub fn institution_exists(conn: &mut SqliteConnection, id: i32) -> Result<bool, ArchiveError> {
    diesel::select(diesel::dsl::exists(institutions::table.find(id)))
        .get_result(conn)
        .map_err(|e| ArchiveError::query("Institution lookup failed", e))
}

/// List institutions, ordered by name
pub fn list_institutions(
    conn: &mut SqliteConnection,
    query: &InstitutionQuery,
    page: Page,
) -> Result<Vec<Institution>, ArchiveError> {
    filtered(query)
        .order((institutions::name.asc(), institutions::id.asc()))
        .limit(page.limit)
        .offset(page.offset)
        .select(Institution::as_select())
        .load(conn)
        .map_err(|e| ArchiveError::query("Institution list failed", e))
}

// ============================================================================
// Write Operations
// ============================================================================

/// Insert an institution and return the stored row
pub fn insert_institution(
    conn: &mut SqliteConnection,
    input: &CreateInstitutionInput,
) -> Result<Institution, ArchiveError> {
    let now = current_timestamp();
    let new_institution = NewInstitution {
        name: &input.name,
        institution_type: &input.institution_type,
        location: input.location.as_deref(),
        established_year: input.established_year,
        total_students: input.total_students,
        total_faculty: input.total_faculty,
        created_at: &now,
        updated_at: &now,
    };

    diesel::insert_into(institutions::table)
        .values(&new_institution)
        .returning(Institution::as_returning())
        .get_result(conn)
        .map_err(|e| ArchiveError::query("Institution insert failed", e))
}
