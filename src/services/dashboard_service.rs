//! Dashboard service - role-scoped summaries

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use crate::config::Config;
use crate::dashboard::{build_dashboard, DashboardLimits, DashboardView};
use crate::db::ArchiveDb;
use crate::error::ArchiveError;

pub struct DashboardService {
    db: Arc<ArchiveDb>,
    limits: DashboardLimits,
}

impl DashboardService {
    pub fn new(db: Arc<ArchiveDb>, limits: DashboardLimits) -> Self {
        Self { db, limits }
    }

    pub fn from_config(db: Arc<ArchiveDb>, config: &Config) -> Self {
        Self::new(
            db,
            DashboardLimits {
                recent_items: config.dashboard_recent_limit,
                metrics: config.dashboard_metrics_limit,
                recent_window: Duration::days(config.recent_window_days),
            },
        )
    }

    pub fn get_dashboard(&self, user_id: i32) -> Result<DashboardView, ArchiveError> {
        self.get_dashboard_at(user_id, Utc::now())
    }

    /// Dashboard with an explicit clock for the recent-uploads window
    pub fn get_dashboard_at(
        &self,
        user_id: i32,
        now: DateTime<Utc>,
    ) -> Result<DashboardView, ArchiveError> {
        self.db
            .with_conn(|conn| build_dashboard(conn, user_id, now, self.limits))
    }
}
