//! ETL job domain types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::db::DbError;

/// Recorded on a job whose hand-off to the ETL service failed.
pub const SUBMIT_FAILED_MESSAGE: &str = "Failed to submit to ETL service";

/// Returned in place of live status when the ETL service cannot be reached.
pub const STATUS_UNAVAILABLE_MESSAGE: &str = "Unable to fetch real-time status";

/// Lifecycle state of an ETL job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown job status '{0}'")]
pub struct UnknownJobStatus(pub String);

impl std::str::FromStr for JobStatus {
    type Err = UnknownJobStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(JobStatus::Pending),
            "running" => Ok(JobStatus::Running),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            other => Err(UnknownJobStatus(other.to_string())),
        }
    }
}

/// Local record of an ETL job
///
/// The record caches the last status observed from the ETL service; the
/// service itself is the authority on progress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EtlJob {
    pub id: String,
    pub filename: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub study_id: Option<String>,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl EtlJob {
    /// A fresh `pending` job with a newly generated id
    pub fn new_pending(filename: impl Into<String>, study_id: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            filename: filename.into(),
            study_id,
            status: JobStatus::Pending,
            created_at: now,
            updated_at: now,
            completed_at: None,
            error_message: None,
        }
    }
}

/// Status as reported by the ETL service, or synthesized from the local
/// record when the service is unreachable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStatusSnapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
    pub status: JobStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl JobStatusSnapshot {
    pub fn degraded(status: JobStatus) -> Self {
        Self {
            job_id: None,
            status,
            progress: None,
            message: Some(STATUS_UNAVAILABLE_MESSAGE.to_string()),
        }
    }
}

/// Errors surfaced by the job lifecycle
///
/// ETL service failures never appear here; they degrade into a result.
#[derive(Debug, Error)]
pub enum JobError {
    #[error("Job {0} not found")]
    NotFound(String),

    #[error(transparent)]
    Persistence(#[from] DbError),
}

pub type JobResult<T> = Result<T, JobError>;
