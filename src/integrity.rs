//! Reference checks that gate every create
//!
//! A write request is turned into a [`Cascade`]: an ordered list of
//! [`Check`]s, each evaluated against an [`IntegritySource`]. The first
//! failing check decides the error and nothing after it runs. Callers only
//! write once `run` returns `Ok`, so a rejected request leaves no rows behind.

use diesel::prelude::*;
use tracing::warn;

use crate::db::diesel_schema::users;
use crate::db::institutions::institution_exists;
use crate::db::metrics::RecordMetricInput;
use crate::db::papers::CreatePaperInput;
use crate::db::subjects::{subject_in_institution, CreateSubjectInput};
use crate::db::testimonials::CreateTestimonialInput;
use crate::db::users::{get_user_by_email, CreateUserInput};
use crate::error::{ArchiveError, ConflictKind, Inconsistency, Missing};

/// The lookups integrity checks need from storage
pub trait IntegritySource {
    fn institution_exists(&mut self, institution_id: i32) -> Result<bool, ArchiveError>;

    /// Institution the user belongs to, `None` if there is no such user
    fn user_institution(&mut self, user_id: i32) -> Result<Option<i32>, ArchiveError>;

    /// True only when the subject exists and is owned by the institution
    fn subject_in_institution(
        &mut self,
        subject_id: i32,
        institution_id: i32,
    ) -> Result<bool, ArchiveError>;

    fn email_taken(&mut self, email: &str) -> Result<bool, ArchiveError>;
}

impl IntegritySource for SqliteConnection {
    fn institution_exists(&mut self, institution_id: i32) -> Result<bool, ArchiveError> {
        institution_exists(self, institution_id)
    }

    fn user_institution(&mut self, user_id: i32) -> Result<Option<i32>, ArchiveError> {
        users::table
            .find(user_id)
            .select(users::institution_id)
            .first::<i32>(self)
            .optional()
            .map_err(|e| ArchiveError::query("User lookup failed", e))
    }

    fn subject_in_institution(
        &mut self,
        subject_id: i32,
        institution_id: i32,
    ) -> Result<bool, ArchiveError> {
        subject_in_institution(self, subject_id, institution_id)
    }

    fn email_taken(&mut self, email: &str) -> Result<bool, ArchiveError> {
        Ok(get_user_by_email(self, email)?.is_some())
    }
}

/// One independently testable predicate over the stored records
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Check {
    InstitutionExists(i32),
    UserExists(i32),
    /// User exists and belongs to the institution
    UserInInstitution { user_id: i32, institution_id: i32 },
    /// Subject exists and belongs to the institution, decided by one lookup
    SubjectInInstitution { subject_id: i32, institution_id: i32 },
    EmailAvailable(String),
}

impl Check {
    pub fn evaluate<S>(&self, source: &mut S) -> Result<(), ArchiveError>
    where
        S: IntegritySource + ?Sized,
    {
        match self {
            Check::InstitutionExists(id) => {
                if source.institution_exists(*id)? {
                    Ok(())
                } else {
                    Err(ArchiveError::NotFound(Missing::Institution(*id)))
                }
            }
            Check::UserExists(id) => match source.user_institution(*id)? {
                Some(_) => Ok(()),
                None => Err(ArchiveError::NotFound(Missing::User(*id))),
            },
            Check::UserInInstitution {
                user_id,
                institution_id,
            } => match source.user_institution(*user_id)? {
                None => Err(ArchiveError::NotFound(Missing::User(*user_id))),
                Some(actual) if actual != *institution_id => Err(ArchiveError::Inconsistent(
                    Inconsistency::UserInstitutionMismatch {
                        user_id: *user_id,
                        user_institution_id: actual,
                        institution_id: *institution_id,
                    },
                )),
                Some(_) => Ok(()),
            },
            Check::SubjectInInstitution {
                subject_id,
                institution_id,
            } => {
                if source.subject_in_institution(*subject_id, *institution_id)? {
                    Ok(())
                } else {
                    Err(ArchiveError::NotFound(Missing::Subject {
                        subject_id: *subject_id,
                        institution_id: *institution_id,
                    }))
                }
            }
            Check::EmailAvailable(email) => {
                if source.email_taken(email)? {
                    Err(ArchiveError::Conflict(ConflictKind::DuplicateEmail(
                        email.clone(),
                    )))
                } else {
                    Ok(())
                }
            }
        }
    }
}

/// Ordered checks for one write; stops at the first failure
#[derive(Debug, Clone)]
pub struct Cascade {
    entity: &'static str,
    checks: Vec<Check>,
}

impl Cascade {
    pub fn new(entity: &'static str, checks: Vec<Check>) -> Self {
        Self { entity, checks }
    }

    /// Institution, then uploader membership, then subject ownership
    pub fn for_paper(input: &CreatePaperInput) -> Self {
        Self::new(
            "paper",
            vec![
                Check::InstitutionExists(input.institution_id),
                Check::UserInInstitution {
                    user_id: input.uploaded_by,
                    institution_id: input.institution_id,
                },
                Check::SubjectInInstitution {
                    subject_id: input.subject_id,
                    institution_id: input.institution_id,
                },
            ],
        )
    }

    pub fn for_user(input: &CreateUserInput) -> Self {
        Self::new(
            "user",
            vec![
                Check::InstitutionExists(input.institution_id),
                Check::EmailAvailable(input.email.clone()),
            ],
        )
    }

    /// User and institution are checked independently; membership is not required
    pub fn for_testimonial(input: &CreateTestimonialInput) -> Self {
        Self::new(
            "testimonial",
            vec![
                Check::UserExists(input.user_id),
                Check::InstitutionExists(input.institution_id),
            ],
        )
    }

    pub fn for_subject(input: &CreateSubjectInput) -> Self {
        Self::new(
            "subject",
            vec![Check::InstitutionExists(input.institution_id)],
        )
    }

    /// Empty unless `enforce_institution` is set
    pub fn for_metric(input: &RecordMetricInput, enforce_institution: bool) -> Self {
        let checks = if enforce_institution {
            vec![Check::InstitutionExists(input.institution_id)]
        } else {
            Vec::new()
        };
        Self::new("metric", checks)
    }

    pub fn run<S>(&self, source: &mut S) -> Result<(), ArchiveError>
    where
        S: IntegritySource + ?Sized,
    {
        for check in &self.checks {
            if let Err(e) = check.evaluate(source) {
                warn!(entity = self.entity, ?check, error = %e, "Rejected write");
                return Err(e);
            }
        }
        Ok(())
    }
}
