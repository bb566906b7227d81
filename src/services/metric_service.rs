//! Metric service - per-institution time series

use std::sync::Arc;

use tracing::info;

use crate::db::metrics::{self, MetricQuery, RecordMetricInput};
use crate::db::{ArchiveDb, Metric};
use crate::error::ArchiveError;
use crate::integrity::Cascade;

use super::validation::validate_metric;
use super::PageLimits;

pub struct MetricService {
    db: Arc<ArchiveDb>,
    limits: PageLimits,
    /// Check the institution exists before recording
    enforce_institution: bool,
}

impl MetricService {
    pub fn new(db: Arc<ArchiveDb>, limits: PageLimits, enforce_institution: bool) -> Self {
        Self {
            db,
            limits,
            enforce_institution,
        }
    }

    pub fn record_metric(&self, input: &RecordMetricInput) -> Result<Metric, ArchiveError> {
        validate_metric(input)?;

        let metric = self.db.with_conn(|conn| {
            Cascade::for_metric(input, self.enforce_institution).run(conn)?;
            metrics::insert_metric(conn, input)
        })?;
        info!(
            id = metric.id,
            institution_id = metric.institution_id,
            metric_type = %metric.metric_type,
            "Recorded metric"
        );
        Ok(metric)
    }

    /// Metrics for one institution, most recent measurement first
    pub fn list_metrics(&self, query: &MetricQuery) -> Result<Vec<Metric>, ArchiveError> {
        let page = self.limits.page(query.limit, query.offset)?;
        self.db
            .with_conn(|conn| metrics::list_metrics(conn, query, page))
    }
}
