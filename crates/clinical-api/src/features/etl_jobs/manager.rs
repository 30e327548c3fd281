//! Job lifecycle manager
//!
//! Owns the ETL job state machine:
//!
//! ```text
//! pending ──submit ok──▶ running ◀──┐
//!    │                     │        │ reconcile: whatever the
//!    └──submit err──▶ failed        │ ETL service reports
//!                          completed ┘
//! ```
//!
//! Store failures propagate to the caller. ETL service failures never do:
//! a failed hand-off becomes a `failed` job and an unreachable status
//! endpoint becomes a degraded snapshot built from the local record.
//!
//! Reconciliation is a read-modify-write without locking. Under the default
//! [`ReconcilePolicy::LastWriteWins`] concurrent polls of the same job may
//! interleave and the last write is kept, and a remote report can move a job
//! out of a terminal state.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::client::EtlOrchestrator;
use super::store::JobStore;
use super::types::{
    EtlJob, JobError, JobResult, JobStatus, JobStatusSnapshot, SUBMIT_FAILED_MESSAGE,
};

/// How a polled status is written back to the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReconcilePolicy {
    /// Overwrite the stored status unconditionally
    #[default]
    LastWriteWins,
    /// Enhancement: write only if the row is unchanged since it was read
    /// (`updated_at` compare-and-swap); a lost race skips the write
    CompareAndSwap,
}

impl std::str::FromStr for ReconcilePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "last-write-wins" | "lww" => Ok(ReconcilePolicy::LastWriteWins),
            "compare-and-swap" | "cas" => Ok(ReconcilePolicy::CompareAndSwap),
            other => Err(format!(
                "unknown reconcile policy '{}' (expected last-write-wins or compare-and-swap)",
                other
            )),
        }
    }
}

/// Coordinates the job store and the ETL service
pub struct JobLifecycleManager {
    store: Arc<dyn JobStore>,
    orchestrator: Arc<dyn EtlOrchestrator>,
    policy: ReconcilePolicy,
}

impl JobLifecycleManager {
    pub fn new(store: Arc<dyn JobStore>, orchestrator: Arc<dyn EtlOrchestrator>) -> Self {
        Self {
            store,
            orchestrator,
            policy: ReconcilePolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: ReconcilePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> ReconcilePolicy {
        self.policy
    }

    /// Check whether the ETL service is reachable
    pub async fn etl_service_reachable(&self) -> bool {
        self.orchestrator.health_check().await
    }

    /// Record a new job and hand it to the ETL service.
    ///
    /// `filename` must already be validated as non-empty. The returned job
    /// carries the status set here (`running` or `failed`), not a re-read.
    #[tracing::instrument(skip(self, filename, study_id), fields(job_id))]
    pub async fn submit_job(
        &self,
        filename: &str,
        study_id: Option<&str>,
    ) -> JobResult<EtlJob> {
        let mut job = EtlJob::new_pending(filename, study_id.map(str::to_string));
        tracing::Span::current().record("job_id", job.id.as_str());

        self.store.create(&job).await?;

        match self
            .orchestrator
            .submit(&job.id, &job.filename, job.study_id.as_deref())
            .await
        {
            Ok(()) => {
                self.store
                    .update_status(&job.id, JobStatus::Running, None)
                    .await?;
                job.status = JobStatus::Running;
                tracing::info!("ETL job submitted");
            },
            Err(e) => {
                tracing::warn!(error = %e, "ETL service rejected job submission");
                self.store
                    .update_status(&job.id, JobStatus::Failed, Some(SUBMIT_FAILED_MESSAGE))
                    .await?;
                job.status = JobStatus::Failed;
                job.error_message = Some(SUBMIT_FAILED_MESSAGE.to_string());
            },
        }

        Ok(job)
    }

    /// Local record, `None` when unknown
    pub async fn get_job(&self, job_id: &str) -> JobResult<Option<EtlJob>> {
        Ok(self.store.get_by_id(job_id).await?)
    }

    /// Live status from the ETL service, reconciled into the local record.
    ///
    /// Falls back to the stored status without writing when the service is
    /// unreachable.
    #[tracing::instrument(skip(self))]
    pub async fn get_job_status(&self, job_id: &str) -> JobResult<JobStatusSnapshot> {
        let existing = self
            .store
            .get_by_id(job_id)
            .await?
            .ok_or_else(|| JobError::NotFound(job_id.to_string()))?;

        let remote = match self.orchestrator.fetch_status(job_id).await {
            Ok(snapshot) => snapshot,
            Err(e) if e.is_unexpected_response() => {
                tracing::warn!(
                    error = %e,
                    last_known = %existing.status,
                    "Unrecognized ETL status report, returning stored status"
                );
                return Ok(JobStatusSnapshot::degraded(existing.status));
            },
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    last_known = %existing.status,
                    "ETL service status unavailable, returning stored status"
                );
                return Ok(JobStatusSnapshot::degraded(existing.status));
            },
        };

        if existing.status.is_terminal() && remote.status != existing.status {
            tracing::warn!(
                stored = %existing.status,
                reported = %remote.status,
                "ETL service reports a different status for a finished job"
            );
        }

        // An empty remote message leaves the stored one untouched
        let message = remote.message.as_deref().filter(|m| !m.is_empty());

        match self.policy {
            ReconcilePolicy::LastWriteWins => {
                self.store
                    .update_status(job_id, remote.status, message)
                    .await?;
            },
            ReconcilePolicy::CompareAndSwap => {
                let written = self
                    .store
                    .update_status_if_unmodified(
                        job_id,
                        remote.status,
                        message,
                        existing.updated_at,
                    )
                    .await?;
                if !written {
                    tracing::info!("Job changed during reconciliation, skipping write");
                }
            },
        }

        tracing::debug!(status = %remote.status, "Job status reconciled");
        Ok(remote)
    }
}
