//! Clinical measurement types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::db::DbError;
use crate::features::shared::{non_blank, parse_date_bound};

/// Upper bound on rows returned by a single measurement query
pub const MAX_ROWS: usize = 1000;

/// A processed clinical measurement. Rows are owned by the ETL pipeline; this
/// service only reads them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ClinicalMeasurement {
    pub id: String,
    pub study_id: String,
    pub participant_id: String,
    pub measurement_type: String,
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub site_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality_score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processed_at: Option<DateTime<Utc>>,
}

/// Raw `GET /api/data` query string
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataQuery {
    pub study_id: Option<String>,
    pub participant_id: Option<String>,
    pub measurement_type: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

/// Validated measurement filters. Every field is optional and the present
/// ones are combined with AND.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeasurementFilters {
    pub study_id: Option<String>,
    pub participant_id: Option<String>,
    pub measurement_type: Option<String>,
    /// Inclusive lower bound on `timestamp`
    pub start_date: Option<DateTime<Utc>>,
    /// Inclusive upper bound on `timestamp`
    pub end_date: Option<DateTime<Utc>>,
}

impl MeasurementFilters {
    pub fn for_study(study_id: impl Into<String>) -> Self {
        Self {
            study_id: Some(study_id.into()),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl TryFrom<DataQuery> for MeasurementFilters {
    type Error = MeasurementError;

    fn try_from(query: DataQuery) -> Result<Self, Self::Error> {
        let owned = |v: &Option<String>| non_blank(v.as_deref()).map(str::to_string);
        let date = |field: &'static str, v: &Option<String>| {
            non_blank(v.as_deref())
                .map(|raw| {
                    parse_date_bound(raw).ok_or_else(|| MeasurementError::InvalidDate {
                        field,
                        value: raw.to_string(),
                    })
                })
                .transpose()
        };

        Ok(Self {
            study_id: owned(&query.study_id),
            participant_id: owned(&query.participant_id),
            measurement_type: owned(&query.measurement_type),
            start_date: date("startDate", &query.start_date)?,
            end_date: date("endDate", &query.end_date)?,
        })
    }
}

#[derive(Debug, Error)]
pub enum MeasurementError {
    #[error("Invalid {field} '{value}': expected YYYY-MM-DD or an RFC 3339 timestamp")]
    InvalidDate { field: &'static str, value: String },

    #[error(transparent)]
    Persistence(#[from] DbError),
}
