//! Subject operations using Diesel

use diesel::prelude::*;
use diesel::sqlite::Sqlite;
use serde::Deserialize;

use super::diesel_schema::subjects;
use super::models::{current_timestamp, NewSubject, Subject};
use super::query::Page;
use crate::error::ArchiveError;

/// Input for creating a subject
#[derive(Debug, Clone, Deserialize)]
pub struct CreateSubjectInput {
    pub name: String,
    pub code: String,
    pub institution_id: i32,
}

/// Query parameters for listing subjects
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubjectQuery {
    #[serde(default)]
    pub institution_id: Option<i32>,
    #[serde(default)]
    pub limit: Option<i64>,
    #[serde(default)]
    pub offset: Option<i64>,
}

pub fn filtered(query: &SubjectQuery) -> subjects::BoxedQuery<'static, Sqlite> {
    let mut base_query = subjects::table.into_boxed();

    if let Some(institution_id) = query.institution_id {
        base_query = base_query.filter(subjects::institution_id.eq(institution_id));
    }

    base_query
}

/// Check that a subject exists *and* belongs to the institution, in one lookup
pub fn subject_in_institution(
    conn: &mut SqliteConnection,
    subject_id: i32,
    institution_id: i32,
) -> Result<bool, ArchiveError> {
    diesel::select(diesel::dsl::exists(
        subjects::table
            .filter(subjects::id.eq(subject_id))
            .filter(subjects::institution_id.eq(institution_id)),
    ))
    .get_result(conn)
    .map_err(|e| ArchiveError::query("Subject lookup failed", e))
}

/// List subjects, ordered by code then id
pub fn list_subjects(
    conn: &mut SqliteConnection,
    query: &SubjectQuery,
    page: Page,
) -> Result<Vec<Subject>, ArchiveError> {
    filtered(query)
        .order((subjects::code.asc(), subjects::id.asc()))
        .limit(page.limit)
        .offset(page.offset)
        .select(Subject::as_select())
        .load(conn)
        .map_err(|e| ArchiveError::query("Subject list failed", e))
}

pub fn insert_subject(
    conn: &mut SqliteConnection,
    input: &CreateSubjectInput,
) -> Result<Subject, ArchiveError> {
    let now = current_timestamp();
    let new_subject = NewSubject {
        name: &input.name,
        code: &input.code,
        institution_id: input.institution_id,
        created_at: &now,
    };

    diesel::insert_into(subjects::table)
        .values(&new_subject)
        .returning(Subject::as_returning())
        .get_result(conn)
        .map_err(|e| ArchiveError::query("Subject insert failed", e))
}
