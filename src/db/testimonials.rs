//! Testimonial operations using Diesel

use diesel::prelude::*;
use diesel::sqlite::Sqlite;
use serde::Deserialize;

use super::diesel_schema::testimonials;
use super::models::{current_timestamp, NewTestimonial, Testimonial};
use super::ordering::order_featured_first;
use super::query::Page;
use crate::error::ArchiveError;

/// Input for creating a testimonial
#[derive(Debug, Clone, Deserialize)]
pub struct CreateTestimonialInput {
    pub user_id: i32,
    pub institution_id: i32,
    pub content: String,
    pub rating: i32,
    #[serde(default)]
    pub video_url: Option<String>,
}

/// Query parameters for listing testimonials
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TestimonialQuery {
    #[serde(default)]
    pub institution_id: Option<i32>,
    #[serde(default)]
    pub featured: Option<bool>,
    #[serde(default)]
    pub limit: Option<i64>,
    #[serde(default)]
    pub offset: Option<i64>,
}

pub fn filtered(query: &TestimonialQuery) -> testimonials::BoxedQuery<'static, Sqlite> {
    let mut base_query = testimonials::table.into_boxed();

    if let Some(institution_id) = query.institution_id {
        base_query = base_query.filter(testimonials::institution_id.eq(institution_id));
    }

    if let Some(featured) = query.featured {
        base_query = base_query.filter(testimonials::is_featured.eq(featured));
    }

    base_query
}

/// List testimonials, featured first then newest
pub fn list_testimonials(
    conn: &mut SqliteConnection,
    query: &TestimonialQuery,
    page: Page,
) -> Result<Vec<Testimonial>, ArchiveError> {
    order_featured_first(filtered(query))
        .limit(page.limit)
        .offset(page.offset)
        .select(Testimonial::as_select())
        .load(conn)
        .map_err(|e| ArchiveError::query("Testimonial list failed", e))
}

/// Count testimonials attributed to an institution
pub fn count_for_institution(
    conn: &mut SqliteConnection,
    institution_id: i32,
) -> Result<i64, ArchiveError> {
    testimonials::table
        .filter(testimonials::institution_id.eq(institution_id))
        .count()
        .get_result(conn)
        .map_err(|e| ArchiveError::query("Testimonial count failed", e))
}

pub fn insert_testimonial(
    conn: &mut SqliteConnection,
    input: &CreateTestimonialInput,
) -> Result<Testimonial, ArchiveError> {
    let now = current_timestamp();
    let new_testimonial = NewTestimonial {
        user_id: input.user_id,
        institution_id: input.institution_id,
        content: &input.content,
        rating: input.rating,
        video_url: input.video_url.as_deref(),
        created_at: &now,
    };

    diesel::insert_into(testimonials::table)
        .values(&new_testimonial)
        .returning(Testimonial::as_returning())
        .get_result(conn)
        .map_err(|e| ArchiveError::query("Testimonial insert failed", e))
}

/// Moderation hook: set or clear the feature flag
pub fn set_featured(
    conn: &mut SqliteConnection,
    id: i32,
    featured: bool,
) -> Result<bool, ArchiveError> {
    let updated = diesel::update(testimonials::table.find(id))
        .set(testimonials::is_featured.eq(featured))
        .execute(conn)
        .map_err(|e| ArchiveError::query("Testimonial update failed", e))?;

    Ok(updated > 0)
}
