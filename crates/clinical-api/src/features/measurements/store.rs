//! Measurement store gateway
//!
//! Read-only access to `clinical_measurements`. Filters become bound
//! parameters; values never reach the SQL text.

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};

use super::types::{ClinicalMeasurement, MeasurementFilters, MAX_ROWS};
use crate::db::DbResult;

#[async_trait]
pub trait MeasurementStore: Send + Sync {
    /// Rows matching every present filter, newest first, at most 1000
    async fn query_measurements(
        &self,
        filters: &MeasurementFilters,
    ) -> DbResult<Vec<ClinicalMeasurement>>;

    /// All rows of one study (same ordering and cap)
    async fn get_study_data(&self, study_id: &str) -> DbResult<Vec<ClinicalMeasurement>> {
        self.query_measurements(&MeasurementFilters::for_study(study_id))
            .await
    }
}

/// PostgreSQL-backed [`MeasurementStore`]
#[derive(Clone)]
pub struct PgMeasurementStore {
    pool: PgPool,
}

impl PgMeasurementStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

pub(crate) fn build_measurements_query(filters: &MeasurementFilters) -> QueryBuilder<'_, Postgres> {
    let mut query = QueryBuilder::new(
        "SELECT id, study_id, participant_id, measurement_type, value, unit, \
         timestamp, site_id, quality_score, processed_at \
         FROM clinical_measurements WHERE 1=1",
    );

    if let Some(study_id) = &filters.study_id {
        query.push(" AND study_id = ").push_bind(study_id.as_str());
    }
    if let Some(participant_id) = &filters.participant_id {
        query.push(" AND participant_id = ").push_bind(participant_id.as_str());
    }
    if let Some(measurement_type) = &filters.measurement_type {
        query.push(" AND measurement_type = ").push_bind(measurement_type.as_str());
    }
    if let Some(start) = filters.start_date {
        query.push(" AND timestamp >= ").push_bind(start);
    }
    if let Some(end) = filters.end_date {
        query.push(" AND timestamp <= ").push_bind(end);
    }

    query.push(" ORDER BY timestamp DESC LIMIT ");
    query.push(MAX_ROWS.to_string());
    query
}

#[async_trait]
impl MeasurementStore for PgMeasurementStore {
    #[tracing::instrument(skip(self))]
    async fn query_measurements(
        &self,
        filters: &MeasurementFilters,
    ) -> DbResult<Vec<ClinicalMeasurement>> {
        let rows = build_measurements_query(filters)
            .build_query_as::<ClinicalMeasurement>()
            .fetch_all(&self.pool)
            .await?;

        tracing::debug!(count = rows.len(), "Measurements fetched");
        Ok(rows)
    }
}
