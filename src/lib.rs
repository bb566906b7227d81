//! QPAS Storage - record service for a question paper archive
//!
//! Institutions, their users and subjects, uploaded question papers,
//! per-institution metrics and testimonials, kept in one SQLite database.
//!
//! ## Architecture
//!
//! - **Integrity**: every create runs an ordered cascade of reference checks
//!   before it writes, so a rejected request leaves no rows
//! - **Queries**: list operations compose optional filters into one
//!   conjunctive WHERE clause, shared with counts and sums
//! - **Dashboard**: the caller's role selects a paper scope; one statistics
//!   routine runs over whichever scope was selected
//! - **Ordering**: testimonials list featured first, then newest, then by id
//!
//! ## Storage Layout
//!
//! ```text
//! ~/.local/share/qpas-storage/
//! ├── archive.db             # SQLite database (WAL mode)
//! └── config.toml            # Configuration
//! ```

pub mod config;
pub mod dashboard;
pub mod db;
pub mod error;
pub mod http;
pub mod integrity;
pub mod services;

// Re-exports
pub use config::Config;
pub use dashboard::{DashboardScope, DashboardView, QuickStats};
pub use db::{ArchiveDb, Page};
pub use error::{ArchiveError, ErrorKind};
pub use http::HttpServer;
pub use integrity::{Cascade, Check};
pub use services::Services;
