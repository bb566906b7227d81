//! Role-scoped dashboard aggregation
//!
//! The caller's role picks a [`DashboardScope`]; the scope yields one paper
//! predicate, and the same statistics routine runs over whichever predicate
//! was picked. Every role therefore gets a [`DashboardView`] of one shape.

use chrono::{DateTime, Duration, Utc};
use diesel::SqliteConnection;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::db::metrics::{list_metrics, MetricQuery};
use crate::db::papers::{count_papers, list_papers, sum_downloads, PaperQuery};
use crate::db::testimonials::count_for_institution;
use crate::db::users::get_user;
use crate::db::{Metric, Page, QuestionPaper, User, UserRole};
use crate::error::{ArchiveError, Missing};

/// Which papers a dashboard looks at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DashboardScope {
    /// Papers the caller uploaded
    OwnPapers { user_id: i32 },
    /// Public papers of the caller's institution
    InstitutionPublic { institution_id: i32 },
    /// Every paper of the caller's institution
    InstitutionWide { institution_id: i32 },
}

impl DashboardScope {
    pub fn for_user(user: &User, role: UserRole) -> Self {
        match role {
            UserRole::Teacher => DashboardScope::OwnPapers { user_id: user.id },
            UserRole::Student => DashboardScope::InstitutionPublic {
                institution_id: user.institution_id,
            },
            UserRole::Administrator => DashboardScope::InstitutionWide {
                institution_id: user.institution_id,
            },
        }
    }

    /// The paper predicate this scope stands for
    pub fn paper_query(&self) -> PaperQuery {
        match *self {
            DashboardScope::OwnPapers { user_id } => PaperQuery {
                uploaded_by: Some(user_id),
                ..Default::default()
            },
            DashboardScope::InstitutionPublic { institution_id } => PaperQuery {
                institution_id: Some(institution_id),
                is_public: Some(true),
                ..Default::default()
            },
            DashboardScope::InstitutionWide { institution_id } => PaperQuery {
                institution_id: Some(institution_id),
                ..Default::default()
            },
        }
    }
}

/// Four-field summary shown on every dashboard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuickStats {
    pub total_papers: i64,
    /// Zero, never null, when the scope is empty
    pub total_downloads: i64,
    /// Uploads with `created_at >= now - window`
    pub recent_uploads: i64,
    /// Testimonials attributed to the caller's institution
    pub collaborations: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardView {
    pub user: User,
    pub recent_items: Vec<QuestionPaper>,
    pub metrics: Vec<Metric>,
    pub stats: QuickStats,
}

/// Bounds applied when building a dashboard
#[derive(Debug, Clone, Copy)]
pub struct DashboardLimits {
    pub recent_items: i64,
    pub metrics: i64,
    pub recent_window: Duration,
}

impl Default for DashboardLimits {
    fn default() -> Self {
        Self {
            recent_items: 5,
            metrics: 10,
            recent_window: Duration::days(30),
        }
    }
}

/// Statistics over one scope
pub fn compute_stats(
    conn: &mut SqliteConnection,
    scope: &DashboardScope,
    institution_id: i32,
    since: DateTime<Utc>,
) -> Result<QuickStats, ArchiveError> {
    let query = scope.paper_query();
    let recent = PaperQuery {
        created_from: Some(since),
        ..query.clone()
    };

    Ok(QuickStats {
        total_papers: count_papers(conn, &query)?,
        total_downloads: sum_downloads(conn, &query)?,
        recent_uploads: count_papers(conn, &recent)?,
        collaborations: count_for_institution(conn, institution_id)?,
    })
}

/// Build the dashboard for `user_id` as of `now`
///
/// Fails only with `NotFound(User)`; any storage error aborts the whole view.
pub fn build_dashboard(
    conn: &mut SqliteConnection,
    user_id: i32,
    now: DateTime<Utc>,
    limits: DashboardLimits,
) -> Result<DashboardView, ArchiveError> {
    let user = get_user(conn, user_id)?.ok_or(ArchiveError::NotFound(Missing::User(user_id)))?;
    let scope = DashboardScope::for_user(&user, user.role()?);
    debug!(user_id, ?scope, "Building dashboard");

    let recent_items = list_papers(conn, &scope.paper_query(), Page::first(limits.recent_items))?;
    let metrics = list_metrics(
        conn,
        &MetricQuery::for_institution(user.institution_id),
        Page::first(limits.metrics),
    )?;
    let stats = compute_stats(conn, &scope, user.institution_id, now - limits.recent_window)?;

    Ok(DashboardView {
        user,
        recent_items,
        metrics,
        stats,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::format_timestamp;
    use crate::db::diesel_schema::question_papers;
    use crate::db::papers::{increment_downloads, insert_paper};
    use crate::db::test_support::{institution, memory_db, paper, paper_input, subject, user};
    use diesel::prelude::*;

    #[test]
    fn test_scope_follows_role() {
        let db = memory_db();
        db.with_conn(|conn| {
            let inst = institution(conn, "Harvard University", "university");
            let t = user(conn, "t@harvard.edu", UserRole::Teacher, inst.id);
            let s = user(conn, "s@harvard.edu", UserRole::Student, inst.id);
            let a = user(conn, "a@harvard.edu", UserRole::Administrator, inst.id);

            assert_eq!(
                DashboardScope::for_user(&t, t.role()?),
                DashboardScope::OwnPapers { user_id: t.id }
            );
            assert_eq!(
                DashboardScope::for_user(&s, s.role()?),
                DashboardScope::InstitutionPublic { institution_id: inst.id }
            );
            assert_eq!(
                DashboardScope::for_user(&a, a.role()?),
                DashboardScope::InstitutionWide { institution_id: inst.id }
            );
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_each_role_sees_its_scope() {
        let db = memory_db();
        db.with_conn(|conn| {
            let inst = institution(conn, "Harvard University", "university");
            let other = institution(conn, "Lincoln School", "school");
            let math = subject(conn, "MATH101", inst.id);
            let art = subject(conn, "ART1", other.id);
            let teacher = user(conn, "t@harvard.edu", UserRole::Teacher, inst.id);
            let colleague = user(conn, "c@harvard.edu", UserRole::Teacher, inst.id);
            let student = user(conn, "s@harvard.edu", UserRole::Student, inst.id);
            let admin = user(conn, "a@harvard.edu", UserRole::Administrator, inst.id);
            let outsider = user(conn, "o@lincoln.edu", UserRole::Teacher, other.id);

            let mine = paper(conn, "Mine", &math, &teacher);
            let private = insert_paper(
                conn,
                &crate::db::papers::CreatePaperInput {
                    is_public: false,
                    ..paper_input("Colleague Private", &math, &colleague)
                },
            )?;
            paper(conn, "Elsewhere", &art, &outsider);
            increment_downloads(conn, mine.id)?;
            increment_downloads(conn, private.id)?;
            increment_downloads(conn, private.id)?;

            let now = Utc::now();
            let limits = DashboardLimits::default();

            let view = build_dashboard(conn, teacher.id, now, limits)?;
            assert_eq!(view.stats.total_papers, 1);
            assert_eq!(view.stats.total_downloads, 1);

            let view = build_dashboard(conn, student.id, now, limits)?;
            assert_eq!(view.stats.total_papers, 1);
            assert_eq!(view.recent_items[0].id, mine.id);

            let view = build_dashboard(conn, admin.id, now, limits)?;
            assert_eq!(view.stats.total_papers, 2);
            assert_eq!(view.stats.total_downloads, 3);
            assert_eq!(view.stats.recent_uploads, 2);
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_empty_scope_sums_to_zero() {
        let db = memory_db();
        db.with_conn(|conn| {
            let inst = institution(conn, "Harvard University", "university");
            let teacher = user(conn, "t@harvard.edu", UserRole::Teacher, inst.id);

            let view = build_dashboard(conn, teacher.id, Utc::now(), DashboardLimits::default())?;
            assert!(view.recent_items.is_empty());
            assert_eq!(
                view.stats,
                QuickStats {
                    total_papers: 0,
                    total_downloads: 0,
                    recent_uploads: 0,
                    collaborations: 0,
                }
            );
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_recent_window_lower_bound_is_inclusive() {
        let db = memory_db();
        db.with_conn(|conn| {
            let inst = institution(conn, "Harvard University", "university");
            let math = subject(conn, "MATH101", inst.id);
            let admin = user(conn, "a@harvard.edu", UserRole::Administrator, inst.id);
            let edge = paper(conn, "Edge", &math, &admin);
            let old = paper(conn, "Old", &math, &admin);

            let now = Utc::now();
            let limits = DashboardLimits::default();
            let boundary = now - limits.recent_window;
            diesel::update(question_papers::table.find(edge.id))
                .set(question_papers::created_at.eq(format_timestamp(&boundary)))
                .execute(conn)
                .unwrap();
            diesel::update(question_papers::table.find(old.id))
                .set(question_papers::created_at.eq(format_timestamp(&(boundary - Duration::seconds(1)))))
                .execute(conn)
                .unwrap();

            let view = build_dashboard(conn, admin.id, now, limits)?;
            assert_eq!(view.stats.total_papers, 2);
            assert_eq!(view.stats.recent_uploads, 1);
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_recent_items_are_capped() {
        let db = memory_db();
        db.with_conn(|conn| {
            let inst = institution(conn, "Harvard University", "university");
            let math = subject(conn, "MATH101", inst.id);
            let teacher = user(conn, "t@harvard.edu", UserRole::Teacher, inst.id);
            let created: Vec<QuestionPaper> = (0..7)
                .map(|i| paper(conn, &format!("Paper {}", i), &math, &teacher))
                .collect();

            let view = build_dashboard(conn, teacher.id, Utc::now(), DashboardLimits::default())?;
            assert_eq!(view.recent_items.len(), 5);
            assert_eq!(view.recent_items[0].id, created[6].id);
            assert_eq!(view.stats.total_papers, 7);
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_unknown_user_is_the_only_failure() {
        let db = memory_db();
        let err = db
            .with_conn(|conn| build_dashboard(conn, 42, Utc::now(), DashboardLimits::default()))
            .unwrap_err();
        assert!(matches!(err, ArchiveError::NotFound(Missing::User(42))));
    }
}
