//! Question paper operations using Diesel
//!
//! `filtered` is the single place a paper WHERE clause is built. Listings,
//! counts, download sums and the dashboard scopes all go through it, so a
//! filter means the same thing everywhere it is used.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::sqlite::Sqlite;
use serde::Deserialize;
use tracing::debug;

use super::diesel_schema::question_papers;
use super::models::{current_timestamp, format_timestamp, NewPaper, PaperRow, QuestionPaper};
use super::query::{contains_pattern, fold_case, search_term, Page, LIKE_ESCAPE};
use crate::error::{ArchiveError, Missing};

// ============================================================================
// Query Types
// ============================================================================

/// Input for creating a question paper
///
/// Has no download count field. Unknown JSON fields such as
/// `download_count` are ignored and new papers always start at zero.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatePaperInput {
    pub title: String,
    pub subject_id: i32,
    pub institution_id: i32,
    pub uploaded_by: i32,
    pub exam_year: i32,
    pub exam_type: String,
    #[serde(default)]
    pub difficulty_level: Option<String>,
    pub file_url: String,
    pub file_size: i64,
    #[serde(default)]
    pub is_public: bool,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

/// Query parameters for listing papers
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaperQuery {
    #[serde(default)]
    pub institution_id: Option<i32>,
    #[serde(default)]
    pub subject_id: Option<i32>,
    #[serde(default)]
    pub uploaded_by: Option<i32>,
    #[serde(default)]
    pub exam_year: Option<i32>,
    #[serde(default)]
    pub exam_type: Option<String>,
    #[serde(default)]
    pub is_public: Option<bool>,
    /// Case-insensitive substring of the title; blank means no search
    #[serde(default)]
    pub search: Option<String>,
    /// Inclusive lower bound on creation time
    #[serde(default, deserialize_with = "super::models::instant::deserialize_option")]
    pub created_from: Option<DateTime<Utc>>,
    /// Inclusive upper bound on creation time
    #[serde(default, deserialize_with = "super::models::instant::deserialize_option")]
    pub created_to: Option<DateTime<Utc>>,
    #[serde(default)]
    pub limit: Option<i64>,
    #[serde(default)]
    pub offset: Option<i64>,
}

// ============================================================================
// Read Operations
// ============================================================================

/// Compose the WHERE clause for a paper query
pub fn filtered(query: &PaperQuery) -> question_papers::BoxedQuery<'static, Sqlite> {
    let mut base_query = question_papers::table.into_boxed();

    if let Some(institution_id) = query.institution_id {
        base_query = base_query.filter(question_papers::institution_id.eq(institution_id));
    }

    if let Some(subject_id) = query.subject_id {
        base_query = base_query.filter(question_papers::subject_id.eq(subject_id));
    }

    if let Some(uploaded_by) = query.uploaded_by {
        base_query = base_query.filter(question_papers::uploaded_by.eq(uploaded_by));
    }

    if let Some(exam_year) = query.exam_year {
        base_query = base_query.filter(question_papers::exam_year.eq(exam_year));
    }

    if let Some(ref exam_type) = query.exam_type {
        base_query = base_query.filter(question_papers::exam_type.eq(exam_type.clone()));
    }

    if let Some(is_public) = query.is_public {
        base_query = base_query.filter(question_papers::is_public.eq(is_public));
    }

    if let Some(term) = search_term(query.search.as_deref()) {
        base_query = base_query.filter(
            fold_case(question_papers::title)
                .like(contains_pattern(term))
                .escape(LIKE_ESCAPE),
        );
    }

    if let Some(ref from) = query.created_from {
        base_query = base_query.filter(question_papers::created_at.ge(format_timestamp(from)));
    }

    if let Some(ref to) = query.created_to {
        base_query = base_query.filter(question_papers::created_at.le(format_timestamp(to)));
    }

    base_query
}

/// Get paper by ID
pub fn get_paper(
    conn: &mut SqliteConnection,
    id: i32,
) -> Result<Option<QuestionPaper>, ArchiveError> {
    question_papers::table
        .find(id)
        .select(PaperRow::as_select())
        .first(conn)
        .optional()
        .map_err(|e| ArchiveError::query("Paper lookup failed", e))?
        .map(QuestionPaper::try_from)
        .transpose()
}

/// List papers, newest first
pub fn list_papers(
    conn: &mut SqliteConnection,
    query: &PaperQuery,
    page: Page,
) -> Result<Vec<QuestionPaper>, ArchiveError> {
    debug!(?query, limit = page.limit, offset = page.offset, "Listing papers");

    let rows: Vec<PaperRow> = filtered(query)
        .order((question_papers::created_at.desc(), question_papers::id.desc()))
        .limit(page.limit)
        .offset(page.offset)
        .select(PaperRow::as_select())
        .load(conn)
        .map_err(|e| ArchiveError::query("Paper list failed", e))?;

    rows.into_iter().map(QuestionPaper::try_from).collect()
}

/// Count papers matching a query (pagination fields ignored)
pub fn count_papers(conn: &mut SqliteConnection, query: &PaperQuery) -> Result<i64, ArchiveError> {
    filtered(query)
        .count()
        .get_result(conn)
        .map_err(|e| ArchiveError::query("Paper count failed", e))
}

/// Sum of download counters over a query; zero when nothing matches
pub fn sum_downloads(conn: &mut SqliteConnection, query: &PaperQuery) -> Result<i64, ArchiveError> {
    let total: Option<i64> = filtered(query)
        .select(diesel::dsl::sum(question_papers::download_count))
        .first(conn)
        .map_err(|e| ArchiveError::query("Download sum failed", e))?;

    Ok(total.unwrap_or(0))
}

// ============================================================================
// Write Operations
// ============================================================================

/// Insert a paper and return the stored row
///
/// Performs no reference checks; callers go through `integrity` first.
pub fn insert_paper(
    conn: &mut SqliteConnection,
    input: &CreatePaperInput,
) -> Result<QuestionPaper, ArchiveError> {
    let tags_json = input.tags.as_ref().map(serde_json::to_string).transpose()?;
    let now = current_timestamp();

    let new_paper = NewPaper {
        title: &input.title,
        subject_id: input.subject_id,
        institution_id: input.institution_id,
        uploaded_by: input.uploaded_by,
        exam_year: input.exam_year,
        exam_type: &input.exam_type,
        difficulty_level: input.difficulty_level.as_deref(),
        file_url: &input.file_url,
        file_size: input.file_size,
        is_public: input.is_public,
        tags_json: tags_json.as_deref(),
        created_at: &now,
        updated_at: &now,
    };

    let row = diesel::insert_into(question_papers::table)
        .values(&new_paper)
        .returning(PaperRow::as_returning())
        .get_result(conn)
        .map_err(|e| ArchiveError::query("Paper insert failed", e))?;

    QuestionPaper::try_from(row)
}

/// Add one to a paper's download counter
pub fn increment_downloads(
    conn: &mut SqliteConnection,
    id: i32,
) -> Result<QuestionPaper, ArchiveError> {
    let row: Option<PaperRow> = diesel::update(question_papers::table.find(id))
        .set(question_papers::download_count.eq(question_papers::download_count + 1))
        .returning(PaperRow::as_returning())
        .get_result(conn)
        .optional()
        .map_err(|e| ArchiveError::query("Download increment failed", e))?;

    row.ok_or(ArchiveError::NotFound(Missing::Paper(id)))
        .and_then(QuestionPaper::try_from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::UserRole;
    use crate::db::test_support::{institution, memory_db, paper, paper_input, subject, user};

    fn titles(rows: &[QuestionPaper]) -> Vec<&str> {
        rows.iter().map(|p| p.title.as_str()).collect()
    }

    #[test]
    fn test_insert_stores_tags_and_zero_downloads() {
        let db = memory_db();
        db.with_conn(|conn| {
            let inst = institution(conn, "Harvard University", "university");
            let teacher = user(conn, "t@h.edu", UserRole::Teacher, inst.id);
            let math = subject(conn, "MATH101", inst.id);

            let mut input = paper_input("Calculus Final", &math, &teacher);
            input.tags = Some(vec![]);
            let created = insert_paper(conn, &input)?;

            assert_eq!(created.download_count, 0);
            assert_eq!(created.tags, Some(vec![]));
            assert_eq!(get_paper(conn, created.id)?, Some(created));
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_each_filter_narrows_independently() {
        let db = memory_db();
        db.with_conn(|conn| {
            let inst = institution(conn, "Harvard University", "university");
            let teacher = user(conn, "t@h.edu", UserRole::Teacher, inst.id);
            let math = subject(conn, "MATH101", inst.id);
            let phys = subject(conn, "PHYS101", inst.id);

            let mut a = paper_input("Calculus Final", &math, &teacher);
            a.exam_year = 2021;
            insert_paper(conn, &a)?;
            let mut b = paper_input("Mechanics Midterm", &phys, &teacher);
            b.exam_type = "midterm".into();
            b.is_public = false;
            insert_paper(conn, &b)?;
            insert_paper(conn, &paper_input("Linear Algebra Final", &math, &teacher))?;

            let all = list_papers(conn, &PaperQuery::default(), Page::default())?;
            assert_eq!(all.len(), 3);

            let by_subject = PaperQuery {
                subject_id: Some(math.id),
                ..Default::default()
            };
            let by_year = PaperQuery {
                exam_year: Some(2021),
                ..Default::default()
            };
            let both = PaperQuery {
                subject_id: Some(math.id),
                exam_year: Some(2021),
                ..Default::default()
            };
            assert_eq!(count_papers(conn, &by_subject)?, 2);
            assert_eq!(count_papers(conn, &by_year)?, 1);
            assert_eq!(titles(&list_papers(conn, &both, Page::default())?), vec!["Calculus Final"]);

            let private = PaperQuery {
                is_public: Some(false),
                ..Default::default()
            };
            assert_eq!(titles(&list_papers(conn, &private, Page::default())?), vec!["Mechanics Midterm"]);

            let midterms = PaperQuery {
                exam_type: Some("midterm".into()),
                ..Default::default()
            };
            assert_eq!(count_papers(conn, &midterms)?, 1);

            let search = PaperQuery {
                search: Some("  FINAL ".into()),
                ..Default::default()
            };
            assert_eq!(count_papers(conn, &search)?, 2);
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_title_search_folds_non_ascii_case() {
        let db = memory_db();
        db.with_conn(|conn| {
            let inst = institution(conn, "Harvard University", "university");
            let teacher = user(conn, "t@h.edu", UserRole::Teacher, inst.id);
            let math = subject(conn, "MATH101", inst.id);
            paper(conn, "Ökonometrie Klausur", &math, &teacher);
            paper(conn, "Algebra Quiz", &math, &teacher);

            let query = PaperQuery {
                search: Some("öKONO".into()),
                ..Default::default()
            };
            assert_eq!(titles(&list_papers(conn, &query, Page::default())?), vec!["Ökonometrie Klausur"]);
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_whitespace_search_behaves_as_absent() {
        let db = memory_db();
        db.with_conn(|conn| {
            let inst = institution(conn, "Harvard University", "university");
            let teacher = user(conn, "t@h.edu", UserRole::Teacher, inst.id);
            let math = subject(conn, "MATH101", inst.id);
            paper(conn, "Calculus Final", &math, &teacher);
            paper(conn, "Algebra Quiz", &math, &teacher);

            let blank = PaperQuery {
                search: Some(" \n ".into()),
                ..Default::default()
            };
            assert_eq!(
                list_papers(conn, &blank, Page::default())?,
                list_papers(conn, &PaperQuery::default(), Page::default())?
            );
            assert_eq!(count_papers(conn, &blank)?, 2);
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_newest_first_with_id_tie_break() {
        let db = memory_db();
        db.with_conn(|conn| {
            let inst = institution(conn, "Harvard University", "university");
            let teacher = user(conn, "t@h.edu", UserRole::Teacher, inst.id);
            let math = subject(conn, "MATH101", inst.id);
            let first = paper(conn, "First", &math, &teacher);
            let second = paper(conn, "Second", &math, &teacher);

            // Force identical timestamps so only the id decides
            diesel::update(question_papers::table)
                .set(question_papers::created_at.eq("2024-01-01T00:00:00.000000Z"))
                .execute(conn)
                .unwrap();

            let rows = list_papers(conn, &PaperQuery::default(), Page::default())?;
            let ids: Vec<i32> = rows.iter().map(|p| p.id).collect();
            assert_eq!(ids, vec![second.id, first.id]);
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_created_range_bounds_are_inclusive() {
        let db = memory_db();
        db.with_conn(|conn| {
            let inst = institution(conn, "Harvard University", "university");
            let teacher = user(conn, "t@h.edu", UserRole::Teacher, inst.id);
            let math = subject(conn, "MATH101", inst.id);
            let p = paper(conn, "Calculus Final", &math, &teacher);

            let stamp = "2024-03-01T12:00:00.000000Z";
            diesel::update(question_papers::table.find(p.id))
                .set(question_papers::created_at.eq(stamp))
                .execute(conn)
                .unwrap();
            let at: DateTime<Utc> = stamp.parse().unwrap();

            let exact = PaperQuery {
                created_from: Some(at),
                created_to: Some(at),
                ..Default::default()
            };
            assert_eq!(count_papers(conn, &exact)?, 1);

            let later = PaperQuery {
                created_from: Some(at + chrono::Duration::seconds(1)),
                ..Default::default()
            };
            assert_eq!(count_papers(conn, &later)?, 0);
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_sum_downloads_is_zero_for_empty_scope() {
        let db = memory_db();
        db.with_conn(|conn| {
            let nothing = PaperQuery {
                institution_id: Some(42),
                ..Default::default()
            };
            assert_eq!(sum_downloads(conn, &nothing)?, 0);
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_increment_downloads() {
        let db = memory_db();
        db.with_conn(|conn| {
            let inst = institution(conn, "Harvard University", "university");
            let teacher = user(conn, "t@h.edu", UserRole::Teacher, inst.id);
            let math = subject(conn, "MATH101", inst.id);
            let p = paper(conn, "Calculus Final", &math, &teacher);

            increment_downloads(conn, p.id)?;
            let bumped = increment_downloads(conn, p.id)?;
            assert_eq!(bumped.download_count, 2);

            let scope = PaperQuery {
                institution_id: Some(inst.id),
                ..Default::default()
            };
            assert_eq!(sum_downloads(conn, &scope)?, 2);

            let err = increment_downloads(conn, p.id + 1).unwrap_err();
            assert!(matches!(err, ArchiveError::NotFound(Missing::Paper(_))));
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_offset_beyond_rows_is_empty() {
        let db = memory_db();
        db.with_conn(|conn| {
            let inst = institution(conn, "Harvard University", "university");
            let teacher = user(conn, "t@h.edu", UserRole::Teacher, inst.id);
            let math = subject(conn, "MATH101", inst.id);
            paper(conn, "Calculus Final", &math, &teacher);

            let query = PaperQuery {
                institution_id: Some(inst.id),
                ..Default::default()
            };
            let rows = list_papers(conn, &query, Page { limit: 20, offset: 50 })?;
            assert!(rows.is_empty());
            Ok(())
        })
        .unwrap();
    }
}
