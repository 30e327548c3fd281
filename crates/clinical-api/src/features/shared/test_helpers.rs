//! In-memory fakes for unit tests
//!
//! ```rust,ignore
//! let store = Arc::new(InMemoryJobStore::default());
//! let etl = Arc::new(FakeEtlService::accepting());
//! let manager = JobLifecycleManager::new(store.clone(), etl.clone());
//!
//! let job = manager.submit_job("file.csv", None).await?;
//! assert_eq!(store.calls().len(), 2);
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Mutex;

use crate::db::{DbError, DbResult};
use crate::features::etl_jobs::client::{EtlOrchestrator, OrchestrationError};
use crate::features::etl_jobs::store::JobStore;
use crate::features::etl_jobs::types::{EtlJob, JobStatus, JobStatusSnapshot};
use crate::features::measurements::store::MeasurementStore;
use crate::features::measurements::types::{ClinicalMeasurement, MeasurementFilters};

/// Mutating call observed by [`InMemoryJobStore`]
#[derive(Debug, Clone, PartialEq)]
pub enum StoreCall {
    Create {
        id: String,
        status: JobStatus,
    },
    UpdateStatus {
        id: String,
        status: JobStatus,
        message: Option<String>,
    },
    GuardedUpdate {
        id: String,
        status: JobStatus,
        message: Option<String>,
    },
}

/// [`JobStore`] over a `HashMap` with the same update rules as the SQL gateway
#[derive(Default)]
pub struct InMemoryJobStore {
    jobs: Mutex<HashMap<String, EtlJob>>,
    calls: Mutex<Vec<StoreCall>>,
    pending_touch: Mutex<Option<(String, JobStatus)>>,
    fail: bool,
}

impl InMemoryJobStore {
    /// Every operation fails with a pool timeout
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn job_with_status(id: &str, status: JobStatus) -> EtlJob {
        let mut job = EtlJob::new_pending("file.csv", Some("study1".to_string()));
        job.id = id.to_string();
        job.status = status;
        job
    }

    /// Seed a record without recording a call
    pub fn insert(&self, job: EtlJob) {
        self.jobs.lock().unwrap().insert(job.id.clone(), job);
    }

    pub fn job(&self, id: &str) -> Option<EtlJob> {
        self.jobs.lock().unwrap().get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.jobs.lock().unwrap().len()
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Simulate a concurrent writer: the next guarded update first sees the
    /// row moved to `status` with a newer `updated_at`
    pub fn touch_before_next_guarded_update(&self, id: &str, status: JobStatus) {
        *self.pending_touch.lock().unwrap() = Some((id.to_string(), status));
    }

    fn check(&self) -> DbResult<()> {
        if self.fail {
            return Err(DbError::Sqlx(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }

    fn apply(job: &mut EtlJob, status: JobStatus, message: Option<&str>, now: DateTime<Utc>) {
        job.status = status;
        job.updated_at = now;
        if status == JobStatus::Completed {
            job.completed_at = Some(now);
        }
        if let Some(message) = message {
            job.error_message = Some(message.to_string());
        }
    }
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn create(&self, job: &EtlJob) -> DbResult<()> {
        self.check()?;
        let mut jobs = self.jobs.lock().unwrap();
        if jobs.contains_key(&job.id) {
            return Err(DbError::duplicate("ETL job", &job.id));
        }
        jobs.insert(job.id.clone(), job.clone());
        self.calls.lock().unwrap().push(StoreCall::Create {
            id: job.id.clone(),
            status: job.status,
        });
        Ok(())
    }

    async fn update_status(
        &self,
        job_id: &str,
        status: JobStatus,
        error_message: Option<&str>,
    ) -> DbResult<()> {
        self.check()?;
        if let Some(job) = self.jobs.lock().unwrap().get_mut(job_id) {
            Self::apply(job, status, error_message, Utc::now());
        }
        self.calls.lock().unwrap().push(StoreCall::UpdateStatus {
            id: job_id.to_string(),
            status,
            message: error_message.map(str::to_string),
        });
        Ok(())
    }

    async fn update_status_if_unmodified(
        &self,
        job_id: &str,
        status: JobStatus,
        error_message: Option<&str>,
        expected_updated_at: DateTime<Utc>,
    ) -> DbResult<bool> {
        self.check()?;
        let mut jobs = self.jobs.lock().unwrap();

        if let Some((id, touched)) = self.pending_touch.lock().unwrap().take() {
            if let Some(job) = jobs.get_mut(&id) {
                let later = job.updated_at + Duration::milliseconds(1);
                Self::apply(job, touched, None, later);
            }
        }

        self.calls.lock().unwrap().push(StoreCall::GuardedUpdate {
            id: job_id.to_string(),
            status,
            message: error_message.map(str::to_string),
        });

        match jobs.get_mut(job_id) {
            Some(job) if job.updated_at == expected_updated_at => {
                Self::apply(job, status, error_message, Utc::now());
                Ok(true)
            },
            _ => Ok(false),
        }
    }

    async fn get_by_id(&self, job_id: &str) -> DbResult<Option<EtlJob>> {
        self.check()?;
        Ok(self.job(job_id))
    }
}

enum EtlBehavior {
    Accept,
    Offline,
    Garbled,
    Report(JobStatusSnapshot),
}

/// [`EtlOrchestrator`] with a fixed behavior that records requests
pub struct FakeEtlService {
    behavior: EtlBehavior,
    submissions: Mutex<Vec<(String, String, Option<String>)>>,
    status_requests: Mutex<Vec<String>>,
}

impl FakeEtlService {
    fn with(behavior: EtlBehavior) -> Self {
        Self {
            behavior,
            submissions: Mutex::new(Vec::new()),
            status_requests: Mutex::new(Vec::new()),
        }
    }

    /// Accepts submissions and reports every job as `running`
    pub fn accepting() -> Self {
        Self::with(EtlBehavior::Accept)
    }

    /// Fails every call as if the service were down
    pub fn offline() -> Self {
        Self::with(EtlBehavior::Offline)
    }

    /// Accepts submissions but answers status polls with an undecodable body
    pub fn garbled() -> Self {
        Self::with(EtlBehavior::Garbled)
    }

    /// Accepts submissions and answers status polls with `snapshot`
    pub fn reporting(snapshot: JobStatusSnapshot) -> Self {
        Self::with(EtlBehavior::Report(snapshot))
    }

    pub fn submissions(&self) -> Vec<(String, String, Option<String>)> {
        self.submissions.lock().unwrap().clone()
    }

    pub fn status_requests(&self) -> Vec<String> {
        self.status_requests.lock().unwrap().clone()
    }

    fn unavailable() -> OrchestrationError {
        OrchestrationError::Status {
            status: reqwest::StatusCode::SERVICE_UNAVAILABLE,
            body: "offline".to_string(),
        }
    }
}

#[async_trait]
impl EtlOrchestrator for FakeEtlService {
    async fn submit(
        &self,
        job_id: &str,
        filename: &str,
        study_id: Option<&str>,
    ) -> Result<(), OrchestrationError> {
        if let EtlBehavior::Offline = self.behavior {
            return Err(Self::unavailable());
        }
        self.submissions.lock().unwrap().push((
            job_id.to_string(),
            filename.to_string(),
            study_id.map(str::to_string),
        ));
        Ok(())
    }

    async fn fetch_status(&self, job_id: &str) -> Result<JobStatusSnapshot, OrchestrationError> {
        self.status_requests.lock().unwrap().push(job_id.to_string());
        match &self.behavior {
            EtlBehavior::Offline => Err(Self::unavailable()),
            EtlBehavior::Garbled => Err(OrchestrationError::UnexpectedResponse(
                "unknown variant `paused`".to_string(),
            )),
            EtlBehavior::Accept => Ok(JobStatusSnapshot {
                job_id: Some(job_id.to_string()),
                status: JobStatus::Running,
                progress: Some(0.0),
                message: None,
            }),
            EtlBehavior::Report(snapshot) => Ok(snapshot.clone()),
        }
    }

    async fn health_check(&self) -> bool {
        !matches!(self.behavior, EtlBehavior::Offline)
    }
}

/// [`MeasurementStore`] over a fixed set of rows, filtered in memory
#[derive(Default)]
pub struct InMemoryMeasurementStore {
    rows: Vec<ClinicalMeasurement>,
    fail: bool,
}

impl InMemoryMeasurementStore {
    pub fn with_rows(rows: Vec<ClinicalMeasurement>) -> Self {
        Self { rows, fail: false }
    }

    pub fn failing() -> Self {
        Self {
            rows: Vec::new(),
            fail: true,
        }
    }

    pub fn measurement(id: &str, study: &str, participant: &str, hour: u32) -> ClinicalMeasurement {
        use chrono::TimeZone;
        ClinicalMeasurement {
            id: id.to_string(),
            study_id: study.to_string(),
            participant_id: participant.to_string(),
            measurement_type: "heart_rate".to_string(),
            value: "72".to_string(),
            unit: Some("bpm".to_string()),
            timestamp: Utc.with_ymd_and_hms(2024, 1, 15, hour, 0, 0).unwrap(),
            site_id: "site-a".to_string(),
            quality_score: Some(0.98),
            processed_at: None,
        }
    }
}

#[async_trait]
impl MeasurementStore for InMemoryMeasurementStore {
    async fn query_measurements(
        &self,
        filters: &MeasurementFilters,
    ) -> DbResult<Vec<ClinicalMeasurement>> {
        if self.fail {
            return Err(DbError::Sqlx(sqlx::Error::PoolTimedOut));
        }

        let mut rows: Vec<_> = self
            .rows
            .iter()
            .filter(|m| filters.study_id.as_deref().map_or(true, |s| m.study_id == s))
            .filter(|m| {
                filters
                    .participant_id
                    .as_deref()
                    .map_or(true, |p| m.participant_id == p)
            })
            .filter(|m| {
                filters
                    .measurement_type
                    .as_deref()
                    .map_or(true, |t| m.measurement_type == t)
            })
            .filter(|m| filters.start_date.map_or(true, |d| m.timestamp >= d))
            .filter(|m| filters.end_date.map_or(true, |d| m.timestamp <= d))
            .cloned()
            .collect();

        rows.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        rows.truncate(crate::features::measurements::types::MAX_ROWS);
        Ok(rows)
    }
}
