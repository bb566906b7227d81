//! Service layer for qpas-storage
//!
//! Services sit between the HTTP handlers and the repository functions.
//! Each one wraps database operations with:
//! - Boundary validation (before any storage access)
//! - The integrity cascade for creates
//! - Pagination defaults and caps from `Config`
//!
//! ## Architecture
//!
//! ```text
//! HTTP Handlers (thin)
//!     ↓
//! Service Layer (validation, integrity, paging)
//!     ↓
//! Repository Layer (db/*.rs)
//!     ↓
//! SQLite Database
//! ```

pub mod dashboard_service;
pub mod directory_service;
pub mod metric_service;
pub mod paper_service;
pub mod response;
pub mod testimonial_service;
pub mod validation;

pub use dashboard_service::DashboardService;
pub use directory_service::DirectoryService;
pub use metric_service::MetricService;
pub use paper_service::PaperService;
pub use testimonial_service::TestimonialService;

use std::sync::Arc;

use crate::config::Config;
use crate::db::{ArchiveDb, Page};
use crate::error::ArchiveError;

/// Default and maximum page sizes for list operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLimits {
    pub default_limit: i64,
    pub max_limit: i64,
}

impl PageLimits {
    pub fn from_config(config: &Config) -> Self {
        Self {
            default_limit: config.default_page_size,
            max_limit: config.max_page_size,
        }
    }

    /// Resolve a request's optional window
    pub fn page(&self, limit: Option<i64>, offset: Option<i64>) -> Result<Page, ArchiveError> {
        Page::from_request(limit, offset, self.default_limit, self.max_limit)
    }
}

impl Default for PageLimits {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Service container
///
/// Holds all services over one shared database.
/// Pass this to HttpServer for handler access.
pub struct Services {
    pub db: Arc<ArchiveDb>,
    pub directory: Arc<DirectoryService>,
    pub papers: Arc<PaperService>,
    pub testimonials: Arc<TestimonialService>,
    pub metrics: Arc<MetricService>,
    pub dashboard: Arc<DashboardService>,
}

impl Services {
    pub fn new(db: Arc<ArchiveDb>, config: &Config) -> Self {
        let limits = PageLimits::from_config(config);

        Self {
            directory: Arc::new(DirectoryService::new(
                db.clone(),
                limits,
                config.featured_institutions_limit,
            )),
            papers: Arc::new(PaperService::new(db.clone(), limits)),
            testimonials: Arc::new(TestimonialService::new(db.clone(), limits)),
            metrics: Arc::new(MetricService::new(
                db.clone(),
                limits,
                config.enforce_metric_institution,
            )),
            dashboard: Arc::new(DashboardService::from_config(db.clone(), config)),
            db,
        }
    }

    /// Services over a fresh in-memory database with default settings
    pub fn in_memory() -> Result<Self, ArchiveError> {
        let db = Arc::new(ArchiveDb::open_in_memory()?);
        Ok(Self::new(db, &Config::default()))
    }
}
