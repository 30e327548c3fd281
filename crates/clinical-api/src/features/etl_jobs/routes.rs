//! ETL job routes

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;

use super::manager::JobLifecycleManager;
use super::types::{EtlJob, JobStatusSnapshot};
use crate::api::response::ApiResponse;
use crate::error::{AppError, AppResult};
use crate::features::shared::non_blank;

pub type JobState = Arc<JobLifecycleManager>;

/// Create ETL job routes
pub fn etl_routes() -> Router<JobState> {
    Router::new()
        .route("/jobs", post(submit_job))
        .route("/jobs/:job_id", get(get_job))
        .route("/jobs/:job_id/status", get(get_job_status))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitJobBody {
    pub filename: Option<String>,
    pub study_id: Option<String>,
}

/// Submit a file for processing
///
/// POST /etl/jobs {"filename": "file.csv", "studyId": "study1"}
///
/// A rejected hand-off still answers 200 with a `failed` job.
#[tracing::instrument(skip(manager, body))]
async fn submit_job(
    State(manager): State<JobState>,
    body: Result<Json<SubmitJobBody>, JsonRejection>,
) -> AppResult<ApiResponse<EtlJob>> {
    let Json(body) = body?;
    // Blank names are rejected; accepted values are stored and forwarded verbatim
    let filename = match body.filename.as_deref() {
        Some(filename) if non_blank(Some(filename)).is_some() => filename,
        _ => return Err(AppError::Validation("filename is required".to_string())),
    };

    let job = manager
        .submit_job(filename, body.study_id.as_deref())
        .await?;

    Ok(ApiResponse::success(job, "ETL job submitted successfully"))
}

/// GET /etl/jobs/:job_id
#[tracing::instrument(skip(manager))]
async fn get_job(
    State(manager): State<JobState>,
    Path(job_id): Path<String>,
) -> AppResult<ApiResponse<EtlJob>> {
    let job = manager
        .get_job(&job_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Job not found".to_string()))?;

    Ok(ApiResponse::success(job, "Job retrieved successfully"))
}

/// Live status, reconciled into the stored record
///
/// GET /etl/jobs/:job_id/status
#[tracing::instrument(skip(manager))]
async fn get_job_status(
    State(manager): State<JobState>,
    Path(job_id): Path<String>,
) -> AppResult<ApiResponse<JobStatusSnapshot>> {
    let snapshot = manager.get_job_status(&job_id).await?;

    Ok(ApiResponse::success(
        snapshot,
        "ETL job status retrieved successfully",
    ))
}
