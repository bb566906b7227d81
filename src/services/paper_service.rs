//! Paper service - question paper uploads, listings and downloads

use std::sync::Arc;

use tracing::info;

use crate::db::papers::{self, CreatePaperInput, PaperQuery};
use crate::db::{ArchiveDb, QuestionPaper};
use crate::error::{ArchiveError, Missing};
use crate::integrity::Cascade;

use super::validation::validate_paper;
use super::PageLimits;

pub struct PaperService {
    db: Arc<ArchiveDb>,
    limits: PageLimits,
}

impl PaperService {
    pub fn new(db: Arc<ArchiveDb>, limits: PageLimits) -> Self {
        Self { db, limits }
    }

    /// Create a paper once institution, uploader and subject all line up
    ///
    /// Any failed check returns before the insert, so nothing is written.
    pub fn create_paper(&self, input: &CreatePaperInput) -> Result<QuestionPaper, ArchiveError> {
        validate_paper(input)?;

        let paper = self.db.with_conn(|conn| {
            Cascade::for_paper(input).run(conn)?;
            papers::insert_paper(conn, input)
        })?;
        info!(
            id = paper.id,
            institution_id = paper.institution_id,
            uploaded_by = paper.uploaded_by,
            "Created paper"
        );
        Ok(paper)
    }

    /// List papers, newest first
    pub fn list_papers(&self, query: &PaperQuery) -> Result<Vec<QuestionPaper>, ArchiveError> {
        let page = self.limits.page(query.limit, query.offset)?;
        self.db.with_conn(|conn| papers::list_papers(conn, query, page))
    }

    pub fn get_paper(&self, id: i32) -> Result<QuestionPaper, ArchiveError> {
        self.db
            .with_conn(|conn| papers::get_paper(conn, id))?
            .ok_or(ArchiveError::NotFound(Missing::Paper(id)))
    }

    /// Count one download and return the updated paper
    pub fn record_download(&self, id: i32) -> Result<QuestionPaper, ArchiveError> {
        self.db
            .with_conn(|conn| papers::increment_downloads(conn, id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::{institution, paper_input, subject, user};
    use crate::db::UserRole;
    use crate::error::Inconsistency;

    #[test]
    fn test_rejected_paper_writes_nothing() {
        let db = Arc::new(ArchiveDb::open_in_memory().unwrap());
        let svc = PaperService::new(db.clone(), PageLimits::default());

        let (input, foreign_input) = db
            .with_conn(|conn| {
                let i1 = institution(conn, "Harvard University", "university");
                let i2 = institution(conn, "Lincoln School", "school");
                let s1 = subject(conn, "MATH101", i1.id);
                let u1 = user(conn, "t@harvard.edu", UserRole::Teacher, i1.id);
                let u2 = user(conn, "t@lincoln.edu", UserRole::Teacher, i2.id);
                let input = paper_input("Calculus Final", &s1, &u1);
                let foreign = CreatePaperInput {
                    uploaded_by: u2.id,
                    ..input.clone()
                };
                Ok((input, foreign))
            })
            .unwrap();

        let err = svc.create_paper(&foreign_input).unwrap_err();
        assert!(matches!(
            err,
            ArchiveError::Inconsistent(Inconsistency::UserInstitutionMismatch { .. })
        ));
        assert_eq!(db.stats().unwrap().papers, 0);

        let created = svc.create_paper(&input).unwrap();
        assert_eq!(created.download_count, 0);
        assert_eq!(db.stats().unwrap().papers, 1);
    }

    #[test]
    fn test_downloads_and_lookup() {
        let db = Arc::new(ArchiveDb::open_in_memory().unwrap());
        let svc = PaperService::new(db.clone(), PageLimits::default());

        let input = db
            .with_conn(|conn| {
                let inst = institution(conn, "Harvard University", "university");
                let s = subject(conn, "PHYS201", inst.id);
                let u = user(conn, "t@harvard.edu", UserRole::Teacher, inst.id);
                Ok(paper_input("Mechanics Quiz", &s, &u))
            })
            .unwrap();

        let paper = svc.create_paper(&input).unwrap();
        svc.record_download(paper.id).unwrap();
        let after = svc.record_download(paper.id).unwrap();
        assert_eq!(after.download_count, 2);
        assert_eq!(svc.get_paper(paper.id).unwrap().download_count, 2);

        assert!(matches!(
            svc.record_download(paper.id + 100),
            Err(ArchiveError::NotFound(Missing::Paper(_)))
        ));
        assert!(matches!(
            svc.get_paper(paper.id + 100),
            Err(ArchiveError::NotFound(Missing::Paper(_)))
        ));
    }

    #[test]
    fn test_list_rejects_negative_offset() {
        let db = Arc::new(ArchiveDb::open_in_memory().unwrap());
        let svc = PaperService::new(db, PageLimits::default());
        let err = svc
            .list_papers(&PaperQuery {
                offset: Some(-1),
                ..Default::default()
            })
            .unwrap_err();
        assert!(matches!(err, ArchiveError::InvalidInput(_)));
    }
}
