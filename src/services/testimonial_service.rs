//! Testimonial service - social proof, featured first

use std::sync::Arc;

use tracing::info;

use crate::db::testimonials::{self, CreateTestimonialInput, TestimonialQuery};
use crate::db::{ArchiveDb, Testimonial};
use crate::error::ArchiveError;
use crate::integrity::Cascade;

use super::validation::validate_testimonial;
use super::PageLimits;

pub struct TestimonialService {
    db: Arc<ArchiveDb>,
    limits: PageLimits,
}

impl TestimonialService {
    pub fn new(db: Arc<ArchiveDb>, limits: PageLimits) -> Self {
        Self { db, limits }
    }

    pub fn create_testimonial(
        &self,
        input: &CreateTestimonialInput,
    ) -> Result<Testimonial, ArchiveError> {
        validate_testimonial(input)?;

        let testimonial = self.db.with_conn(|conn| {
            Cascade::for_testimonial(input).run(conn)?;
            testimonials::insert_testimonial(conn, input)
        })?;
        info!(
            id = testimonial.id,
            user_id = testimonial.user_id,
            institution_id = testimonial.institution_id,
            rating = testimonial.rating,
            "Created testimonial"
        );
        Ok(testimonial)
    }

    /// Featured first, then newest, then highest id
    pub fn list_testimonials(
        &self,
        query: &TestimonialQuery,
    ) -> Result<Vec<Testimonial>, ArchiveError> {
        let page = self.limits.page(query.limit, query.offset)?;
        self.db
            .with_conn(|conn| testimonials::list_testimonials(conn, query, page))
    }

    /// The ordered listing restricted to featured rows
    pub fn featured_testimonials(
        &self,
        query: &TestimonialQuery,
    ) -> Result<Vec<Testimonial>, ArchiveError> {
        self.list_testimonials(&TestimonialQuery {
            featured: Some(true),
            ..query.clone()
        })
    }
}
