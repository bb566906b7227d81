//! Metric time-series operations using Diesel
//!
//! Metrics are append-only rows keyed by institution and metric type, with a
//! measured-on `date` that is independent of `created_at`.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::sqlite::Sqlite;
use serde::Deserialize;

use super::diesel_schema::metrics;
use super::models::{current_timestamp, format_timestamp, Metric, NewMetric};
use super::query::Page;
use crate::error::ArchiveError;

/// Input for recording a metric
#[derive(Debug, Clone, Deserialize)]
pub struct RecordMetricInput {
    pub institution_id: i32,
    pub metric_type: String,
    pub value: i64,
    /// Measured-on instant; a plain date means midnight UTC
    #[serde(deserialize_with = "super::models::instant::deserialize")]
    pub date: DateTime<Utc>,
}

/// Query parameters for listing metrics
#[derive(Debug, Clone, Deserialize)]
pub struct MetricQuery {
    pub institution_id: i32,
    #[serde(default)]
    pub metric_type: Option<String>,
    /// Inclusive lower bound on `date`
    #[serde(default, deserialize_with = "super::models::instant::deserialize_option")]
    pub start_date: Option<DateTime<Utc>>,
    /// Inclusive upper bound on `date`
    #[serde(default, deserialize_with = "super::models::instant::deserialize_option")]
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub limit: Option<i64>,
    #[serde(default)]
    pub offset: Option<i64>,
}

impl MetricQuery {
    pub fn for_institution(institution_id: i32) -> Self {
        Self {
            institution_id,
            metric_type: None,
            start_date: None,
            end_date: None,
            limit: None,
            offset: None,
        }
    }
}

pub fn filtered(query: &MetricQuery) -> metrics::BoxedQuery<'static, Sqlite> {
    let mut base_query = metrics::table
        .filter(metrics::institution_id.eq(query.institution_id))
        .into_boxed();

    if let Some(ref metric_type) = query.metric_type {
        base_query = base_query.filter(metrics::metric_type.eq(metric_type.clone()));
    }

    if let Some(ref start) = query.start_date {
        base_query = base_query.filter(metrics::date.ge(format_timestamp(start)));
    }

    if let Some(ref end) = query.end_date {
        base_query = base_query.filter(metrics::date.le(format_timestamp(end)));
    }

    base_query
}

/// List metrics, most recent measurement first
pub fn list_metrics(
    conn: &mut SqliteConnection,
    query: &MetricQuery,
    page: Page,
) -> Result<Vec<Metric>, ArchiveError> {
    filtered(query)
        .order((metrics::date.desc(), metrics::id.desc()))
        .limit(page.limit)
        .offset(page.offset)
        .select(Metric::as_select())
        .load(conn)
        .map_err(|e| ArchiveError::query("Metric list failed", e))
}

pub fn insert_metric(
    conn: &mut SqliteConnection,
    input: &RecordMetricInput,
) -> Result<Metric, ArchiveError> {
    let date = format_timestamp(&input.date);
    let now = current_timestamp();
    let new_metric = NewMetric {
        institution_id: input.institution_id,
        metric_type: &input.metric_type,
        value: input.value,
        date: &date,
        created_at: &now,
    };

    diesel::insert_into(metrics::table)
        .values(&new_metric)
        .returning(Metric::as_returning())
        .get_result(conn)
        .map_err(|e| ArchiveError::query("Metric insert failed", e))
}
