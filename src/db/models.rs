//! Diesel model definitions for database tables
//!
//! - Queryable structs: for SELECT queries (reading data)
//! - Insertable structs: for INSERT queries (writing data)
//!
//! Question papers are the one table whose row shape differs from the API
//! shape: tags live in a JSON text column and are decoded into
//! [`QuestionPaper`].

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Deserializer, Serialize};

use super::diesel_schema::*;
use crate::error::ArchiveError;

// ============================================================================
// Timestamp Helpers (SQLite stores timestamps as TEXT)
// ============================================================================

/// Fixed-width UTC format; lexicographic order equals chronological order.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6fZ";

/// Format a UTC instant for SQLite TEXT columns
pub fn format_timestamp(at: &DateTime<Utc>) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

/// Get current UTC timestamp for SQLite TEXT columns
pub fn current_timestamp() -> String {
    format_timestamp(&Utc::now())
}

/// Parse an RFC 3339 instant or a plain `YYYY-MM-DD` date (midnight UTC)
pub fn parse_instant(raw: &str) -> Result<DateTime<Utc>, String> {
    let raw = raw.trim();
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Ok(at.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map(|day| day.and_time(NaiveTime::MIN).and_utc())
        .map_err(|_| format!("expected RFC 3339 timestamp or YYYY-MM-DD date, got {:?}", raw))
}

/// Serde adapters for request fields that take a date or a full timestamp
pub mod instant {
    use super::*;
    use serde::de::Error;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse_instant(&raw).map_err(D::Error::custom)
    }

    pub fn deserialize_option<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<String>::deserialize(deserializer)? {
            Some(raw) => parse_instant(&raw).map(Some).map_err(D::Error::custom),
            None => Ok(None),
        }
    }
}

// ============================================================================
// Roles
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Student,
    Teacher,
    Administrator,
}

impl UserRole {
    pub const ALL: [UserRole; 3] = [UserRole::Student, UserRole::Teacher, UserRole::Administrator];

    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Student => "student",
            UserRole::Teacher => "teacher",
            UserRole::Administrator => "administrator",
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserRole {
    type Err = ArchiveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        UserRole::ALL
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| ArchiveError::InvalidInput(format!("Unknown role: {}", s)))
    }
}

// ============================================================================
// Institution Models
// ============================================================================

#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = institutions)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Institution {
    pub id: i32,
    pub name: String,
    #[serde(rename = "type")]
    pub institution_type: String,
    pub location: Option<String>,
    pub established_year: Option<i32>,
    pub total_students: Option<i32>,
    pub total_faculty: Option<i32>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = institutions)]
pub struct NewInstitution<'a> {
    pub name: &'a str,
    pub institution_type: &'a str,
    pub location: Option<&'a str>,
    pub established_year: Option<i32>,
    pub total_students: Option<i32>,
    pub total_faculty: Option<i32>,
    pub created_at: &'a str,
    pub updated_at: &'a str,
}

// ============================================================================
// User Models
// ============================================================================

#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct User {
    pub id: i32,
    pub email: String,
    pub name: String,
    pub role: String,
    pub institution_id: i32,
    pub created_at: String,
    pub updated_at: String,
}

impl User {
    /// Parsed role; rows are only ever written with a valid role.
    pub fn role(&self) -> Result<UserRole, ArchiveError> {
        self.role
            .parse()
            .map_err(|_| ArchiveError::Storage(format!("User {} has corrupt role {:?}", self.id, self.role)))
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = users)]
pub struct NewUser<'a> {
    pub email: &'a str,
    pub name: &'a str,
    pub role: &'a str,
    pub institution_id: i32,
    pub created_at: &'a str,
    pub updated_at: &'a str,
}

// ============================================================================
// Subject Models
// ============================================================================

#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = subjects)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Subject {
    pub id: i32,
    pub name: String,
    pub code: String,
    pub institution_id: i32,
    pub created_at: String,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = subjects)]
pub struct NewSubject<'a> {
    pub name: &'a str,
    pub code: &'a str,
    pub institution_id: i32,
    pub created_at: &'a str,
}

// ============================================================================
// Question Paper Models
// ============================================================================

/// Question paper row from SELECT query
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = question_papers)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct PaperRow {
    pub id: i32,
    pub title: String,
    pub subject_id: i32,
    pub institution_id: i32,
    pub uploaded_by: i32,
    pub exam_year: i32,
    pub exam_type: String,
    pub difficulty_level: Option<String>,
    pub file_url: String,
    pub file_size: i64,
    pub download_count: i32,
    pub is_public: bool,
    pub tags_json: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Question paper with decoded tags (API response)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionPaper {
    pub id: i32,
    pub title: String,
    pub subject_id: i32,
    pub institution_id: i32,
    pub uploaded_by: i32,
    pub exam_year: i32,
    pub exam_type: String,
    pub difficulty_level: Option<String>,
    pub file_url: String,
    pub file_size: i64,
    pub download_count: i32,
    pub is_public: bool,
    pub tags: Option<Vec<String>>,
    pub created_at: String,
    pub updated_at: String,
}

impl TryFrom<PaperRow> for QuestionPaper {
    type Error = ArchiveError;

    fn try_from(row: PaperRow) -> Result<Self, Self::Error> {
        let tags = row
            .tags_json
            .as_deref()
            .map(serde_json::from_str::<Vec<String>>)
            .transpose()
            .map_err(|e| ArchiveError::Storage(format!("Paper {} has corrupt tags: {}", row.id, e)))?;

        Ok(QuestionPaper {
            id: row.id,
            title: row.title,
            subject_id: row.subject_id,
            institution_id: row.institution_id,
            uploaded_by: row.uploaded_by,
            exam_year: row.exam_year,
            exam_type: row.exam_type,
            difficulty_level: row.difficulty_level,
            file_url: row.file_url,
            file_size: row.file_size,
            download_count: row.download_count,
            is_public: row.is_public,
            tags,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// New question paper for INSERT. There is no download count field: the
/// column default of 0 always applies.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = question_papers)]
pub struct NewPaper<'a> {
    pub title: &'a str,
    pub subject_id: i32,
    pub institution_id: i32,
    pub uploaded_by: i32,
    pub exam_year: i32,
    pub exam_type: &'a str,
    pub difficulty_level: Option<&'a str>,
    pub file_url: &'a str,
    pub file_size: i64,
    pub is_public: bool,
    pub tags_json: Option<&'a str>,
    pub created_at: &'a str,
    pub updated_at: &'a str,
}

// ============================================================================
// Metric Models
// ============================================================================

#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = metrics)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Metric {
    pub id: i32,
    pub institution_id: i32,
    pub metric_type: String,
    pub value: i64,
    pub date: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = metrics)]
pub struct NewMetric<'a> {
    pub institution_id: i32,
    pub metric_type: &'a str,
    pub value: i64,
    pub date: &'a str,
    pub created_at: &'a str,
}

// ============================================================================
// Testimonial Models
// ============================================================================

#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = testimonials)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Testimonial {
    pub id: i32,
    pub user_id: i32,
    pub institution_id: i32,
    pub content: String,
    pub rating: i32,
    pub is_featured: bool,
    pub video_url: Option<String>,
    pub created_at: String,
}

/// New testimonial for INSERT. `is_featured` is left to the column default.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = testimonials)]
pub struct NewTestimonial<'a> {
    pub user_id: i32,
    pub institution_id: i32,
    pub content: &'a str,
    pub rating: i32,
    pub video_url: Option<&'a str>,
    pub created_at: &'a str,
}
