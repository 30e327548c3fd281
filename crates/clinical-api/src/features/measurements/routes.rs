//! Measurement routes
//!
//! Read-only query endpoints over processed clinical data.

use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    routing::get,
    Router,
};
use std::sync::Arc;

use super::store::MeasurementStore;
use super::types::{ClinicalMeasurement, DataQuery, MeasurementFilters};
use crate::api::response::ApiResponse;
use crate::error::{AppError, AppResult};

pub type MeasurementState = Arc<dyn MeasurementStore>;

/// Create measurement routes
pub fn data_routes() -> Router<MeasurementState> {
    Router::new()
        .route("/", get(query_data))
        .route("/studies/:study_id", get(get_study_data))
}

/// Query measurements
///
/// GET /data?studyId=s1&participantId=p1&measurementType=glucose&startDate=2024-01-01&endDate=2024-01-31
#[tracing::instrument(skip(store, query))]
async fn query_data(
    State(store): State<MeasurementState>,
    query: Result<Query<DataQuery>, QueryRejection>,
) -> AppResult<ApiResponse<Vec<ClinicalMeasurement>>> {
    let Query(query) = query?;
    let filters = MeasurementFilters::try_from(query)?;

    let rows = store.query_measurements(&filters).await?;

    Ok(ApiResponse::success(rows, "Data retrieved successfully"))
}

/// All measurements of one study
///
/// GET /data/studies/:study_id
#[tracing::instrument(skip(store))]
async fn get_study_data(
    State(store): State<MeasurementState>,
    Path(study_id): Path<String>,
) -> AppResult<ApiResponse<Vec<ClinicalMeasurement>>> {
    let rows = store.get_study_data(&study_id).await?;

    if rows.is_empty() {
        return Err(AppError::NotFound("Study not found".to_string()));
    }

    Ok(ApiResponse::success(rows, "Study data retrieved successfully"))
}
