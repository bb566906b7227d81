//! Directory service - institutions, subjects and users
//!
//! The roots of the data model. Institutions have no dependencies; subjects
//! and users require their institution to exist, and users also need a free
//! email address.

use std::sync::Arc;

use tracing::info;

use crate::db::institutions::{self, CreateInstitutionInput, InstitutionQuery};
use crate::db::subjects::{self, CreateSubjectInput, SubjectQuery};
use crate::db::users::{self, CreateUserInput, UserQuery};
use crate::db::{ArchiveDb, Institution, Page, Subject, User};
use crate::error::{ArchiveError, Missing};
use crate::integrity::Cascade;

use super::validation::{validate_institution, validate_subject, validate_user};
use super::PageLimits;

pub struct DirectoryService {
    db: Arc<ArchiveDb>,
    limits: PageLimits,
    featured_limit: i64,
}

impl DirectoryService {
    pub fn new(db: Arc<ArchiveDb>, limits: PageLimits, featured_limit: i64) -> Self {
        Self {
            db,
            limits,
            featured_limit,
        }
    }

    // =========================================================================
    // Institutions
    // =========================================================================

    pub fn create_institution(
        &self,
        input: &CreateInstitutionInput,
    ) -> Result<Institution, ArchiveError> {
        validate_institution(input)?;

        let institution = self
            .db
            .with_conn(|conn| institutions::insert_institution(conn, input))?;
        info!(id = institution.id, name = %institution.name, "Created institution");
        Ok(institution)
    }

    /// List institutions by name, filtered by search text and type
    pub fn list_institutions(
        &self,
        query: &InstitutionQuery,
    ) -> Result<Vec<Institution>, ArchiveError> {
        let page = self.limits.page(query.limit, query.offset)?;
        self.db
            .with_conn(|conn| institutions::list_institutions(conn, query, page))
    }

    pub fn get_institution(&self, id: i32) -> Result<Institution, ArchiveError> {
        self.db
            .with_conn(|conn| institutions::get_institution(conn, id))?
            .ok_or(ArchiveError::NotFound(Missing::Institution(id)))
    }

    /// The first few institutions in name order
    pub fn featured_institutions(&self) -> Result<Vec<Institution>, ArchiveError> {
        self.db.with_conn(|conn| {
            institutions::list_institutions(
                conn,
                &InstitutionQuery::default(),
                Page::first(self.featured_limit),
            )
        })
    }

    // =========================================================================
    // Subjects
    // =========================================================================

    pub fn create_subject(&self, input: &CreateSubjectInput) -> Result<Subject, ArchiveError> {
        validate_subject(input)?;

        let subject = self.db.with_conn(|conn| {
            Cascade::for_subject(input).run(conn)?;
            subjects::insert_subject(conn, input)
        })?;
        info!(
            id = subject.id,
            code = %subject.code,
            institution_id = subject.institution_id,
            "Created subject"
        );
        Ok(subject)
    }

    pub fn list_subjects(&self, query: &SubjectQuery) -> Result<Vec<Subject>, ArchiveError> {
        let page = self.limits.page(query.limit, query.offset)?;
        self.db
            .with_conn(|conn| subjects::list_subjects(conn, query, page))
    }

    // =========================================================================
    // Users
    // =========================================================================

    pub fn create_user(&self, input: &CreateUserInput) -> Result<User, ArchiveError> {
        validate_user(input)?;

        let user = self.db.with_conn(|conn| {
            Cascade::for_user(input).run(conn)?;
            users::insert_user(conn, input)
        })?;
        info!(
            id = user.id,
            role = %input.role,
            institution_id = user.institution_id,
            "Created user"
        );
        Ok(user)
    }

    pub fn list_users(&self, query: &UserQuery) -> Result<Vec<User>, ArchiveError> {
        let page = self.limits.page(query.limit, query.offset)?;
        self.db.with_conn(|conn| users::list_users(conn, query, page))
    }

    pub fn get_user(&self, id: i32) -> Result<User, ArchiveError> {
        self.db
            .with_conn(|conn| users::get_user(conn, id))?
            .ok_or(ArchiveError::NotFound(Missing::User(id)))
    }
}
