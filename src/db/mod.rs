//! SQLite database module for archive records
//!
//! ## Architecture
//!
//! - One SQLite file per deployment, shared through an r2d2 pool
//! - Repository functions take `&mut SqliteConnection`, one module per table
//! - `query` holds the pagination and filter helpers every list reuses
//!
//! ## Tables
//!
//! - `institutions` - Tenants (universities, colleges, schools)
//! - `users` - Members of exactly one institution, unique email
//! - `subjects` - Courses owned by an institution
//! - `question_papers` - Uploaded papers, tags stored as JSON text
//! - `metrics` - Append-only per-institution time series
//! - `testimonials` - Social proof, optionally featured

pub mod diesel_schema;
pub mod institutions;
pub mod metrics;
pub mod models;
pub mod ordering;
pub mod papers;
pub mod query;
pub mod schema;
pub mod subjects;
pub mod testimonials;
pub mod users;

use std::path::Path;

use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, CustomizeConnection, Pool, PooledConnection};
use serde::Serialize;
use tracing::{debug, info};

use crate::error::ArchiveError;

pub type DbPool = Pool<ConnectionManager<SqliteConnection>>;
pub type DbConn = PooledConnection<ConnectionManager<SqliteConnection>>;

/// Per-connection setup: SQL functions always, pragmas for file-backed databases
#[derive(Debug, Clone, Copy)]
struct ConnectionSetup {
    file_backed: bool,
}

impl CustomizeConnection<SqliteConnection, diesel::r2d2::Error> for ConnectionSetup {
    fn on_acquire(&self, conn: &mut SqliteConnection) -> Result<(), diesel::r2d2::Error> {
        query::register_functions(conn).map_err(diesel::r2d2::Error::QueryError)?;
        if self.file_backed {
            // WAL for concurrent readers, busy_timeout so writers queue instead of failing
            conn.batch_execute(
                "PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL; PRAGMA busy_timeout=5000;",
            )
            .map_err(diesel::r2d2::Error::QueryError)?;
        }
        Ok(())
    }
}

/// SQLite database for archive records
pub struct ArchiveDb {
    pool: DbPool,
}

impl ArchiveDb {
    /// Open or create the archive database at `db_path`
    pub fn open(db_path: &Path) -> Result<Self, ArchiveError> {
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        info!("Opening SQLite database at {:?}", db_path);

        let manager = ConnectionManager::<SqliteConnection>::new(db_path.to_string_lossy());
        let pool = Pool::builder()
            .max_size(8)
            .connection_customizer(Box::new(ConnectionSetup { file_backed: true }))
            .build(manager)?;

        let db = Self { pool };
        db.init_schema()?;
        Ok(db)
    }

    /// Open an in-memory database (for testing)
    ///
    /// Each SQLite in-memory connection is its own database, so the pool is
    /// pinned to a single connection that is never recycled.
    pub fn open_in_memory() -> Result<Self, ArchiveError> {
        debug!("Opening in-memory SQLite database");

        let manager = ConnectionManager::<SqliteConnection>::new(":memory:");
        let pool = Pool::builder()
            .max_size(1)
            .min_idle(Some(1))
            .idle_timeout(None)
            .max_lifetime(None)
            .connection_customizer(Box::new(ConnectionSetup { file_backed: false }))
            .build(manager)?;

        let db = Self { pool };
        db.init_schema()?;
        Ok(db)
    }

    fn init_schema(&self) -> Result<(), ArchiveError> {
        let mut conn = self.pool.get()?;
        schema::init_schema(&mut conn)
    }

    /// Run `f` with a pooled connection
    pub fn with_conn<F, T>(&self, f: F) -> Result<T, ArchiveError>
    where
        F: FnOnce(&mut SqliteConnection) -> Result<T, ArchiveError>,
    {
        let mut conn: DbConn = self.pool.get()?;
        f(&mut conn)
    }

    /// Get database statistics
    pub fn stats(&self) -> Result<DbStats, ArchiveError> {
        use diesel_schema::*;

        self.with_conn(|conn| {
            let count = |res: QueryResult<i64>| {
                res.map(|n| n as u64)
                    .map_err(|e| ArchiveError::query("Count query failed", e))
            };

            Ok(DbStats {
                institutions: count(institutions::table.count().get_result(conn))?,
                users: count(users::table.count().get_result(conn))?,
                subjects: count(subjects::table.count().get_result(conn))?,
                papers: count(question_papers::table.count().get_result(conn))?,
                metrics: count(metrics::table.count().get_result(conn))?,
                testimonials: count(testimonials::table.count().get_result(conn))?,
            })
        })
    }
}

/// Database statistics
#[derive(Debug, Clone, Serialize)]
pub struct DbStats {
    pub institutions: u64,
    pub users: u64,
    pub subjects: u64,
    pub papers: u64,
    pub metrics: u64,
    pub testimonials: u64,
}

// Re-exports
pub use models::{
    Institution, Metric, QuestionPaper, Subject, Testimonial, User, UserRole,
};
pub use query::Page;
