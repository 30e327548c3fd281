//! Job store gateway
//!
//! Pure persistence for `etl_jobs` rows. No business rules live here: the
//! lifecycle manager decides which status to write and when.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};

use super::types::{EtlJob, JobStatus};
use crate::db::{DbError, DbResult};

/// Persistence surface for ETL job records
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Insert a new job row
    async fn create(&self, job: &EtlJob) -> DbResult<()>;

    /// Set `status` and refresh `updated_at`.
    ///
    /// `completed_at` is stamped only for [`JobStatus::Completed`] and
    /// `error_message` is written only when one is supplied. Updating an
    /// unknown id affects no rows and is not an error.
    async fn update_status(
        &self,
        job_id: &str,
        status: JobStatus,
        error_message: Option<&str>,
    ) -> DbResult<()>;

    /// Same as [`JobStore::update_status`], applied only while the row's
    /// `updated_at` still equals `expected_updated_at`. Returns whether the
    /// row was written.
    async fn update_status_if_unmodified(
        &self,
        job_id: &str,
        status: JobStatus,
        error_message: Option<&str>,
        expected_updated_at: DateTime<Utc>,
    ) -> DbResult<bool>;

    async fn get_by_id(&self, job_id: &str) -> DbResult<Option<EtlJob>>;
}

/// PostgreSQL-backed [`JobStore`]
#[derive(Clone)]
pub struct PgJobStore {
    pool: PgPool,
}

impl PgJobStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Assemble the status UPDATE. Placeholders are numbered in the order the
/// optional clauses are appended.
pub(crate) fn build_status_update<'a>(
    job_id: &'a str,
    status: JobStatus,
    error_message: Option<&'a str>,
    now: DateTime<Utc>,
    expected_updated_at: Option<DateTime<Utc>>,
) -> QueryBuilder<'a, Postgres> {
    let mut query = QueryBuilder::new("UPDATE etl_jobs SET status = ");
    query.push_bind(status.as_str());
    query.push(", updated_at = ").push_bind(now);

    if status == JobStatus::Completed {
        query.push(", completed_at = ").push_bind(now);
    }

    if let Some(message) = error_message {
        query.push(", error_message = ").push_bind(message);
    }

    query.push(" WHERE id = ").push_bind(job_id);

    if let Some(expected) = expected_updated_at {
        query.push(" AND updated_at = ").push_bind(expected);
    }

    query
}

#[derive(Debug, sqlx::FromRow)]
struct JobRow {
    id: String,
    filename: String,
    study_id: Option<String>,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    error_message: Option<String>,
}

impl TryFrom<JobRow> for EtlJob {
    type Error = DbError;

    fn try_from(row: JobRow) -> Result<Self, Self::Error> {
        let status = row.status.parse().map_err(|_| DbError::Corrupt {
            column: "status",
            value: row.status.clone(),
        })?;

        Ok(EtlJob {
            id: row.id,
            filename: row.filename,
            study_id: row.study_id,
            status,
            created_at: row.created_at,
            updated_at: row.updated_at,
            completed_at: row.completed_at,
            error_message: row.error_message,
        })
    }
}

#[async_trait]
impl JobStore for PgJobStore {
    #[tracing::instrument(skip(self, job), fields(job_id = %job.id))]
    async fn create(&self, job: &EtlJob) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO etl_jobs (id, filename, study_id, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(&job.id)
        .bind(&job.filename)
        .bind(&job.study_id)
        .bind(job.status.as_str())
        .bind(job.created_at)
        .bind(job.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| DbError::from_insert(e, "ETL job", &job.id))?;

        tracing::debug!("ETL job record created");
        Ok(())
    }

    #[tracing::instrument(skip(self, error_message), fields(status = %status))]
    async fn update_status(
        &self,
        job_id: &str,
        status: JobStatus,
        error_message: Option<&str>,
    ) -> DbResult<()> {
        let result = build_status_update(job_id, status, error_message, Utc::now(), None)
            .build()
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            tracing::debug!("Status update matched no ETL job row");
        }

        Ok(())
    }

    #[tracing::instrument(skip(self, error_message), fields(status = %status))]
    async fn update_status_if_unmodified(
        &self,
        job_id: &str,
        status: JobStatus,
        error_message: Option<&str>,
        expected_updated_at: DateTime<Utc>,
    ) -> DbResult<bool> {
        let result = build_status_update(
            job_id,
            status,
            error_message,
            Utc::now(),
            Some(expected_updated_at),
        )
        .build()
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    #[tracing::instrument(skip(self))]
    async fn get_by_id(&self, job_id: &str) -> DbResult<Option<EtlJob>> {
        let row = sqlx::query_as::<_, JobRow>(
            r#"
            SELECT id, filename, study_id, status, created_at, updated_at,
                   completed_at, error_message
            FROM etl_jobs
            WHERE id = $1
            "#,
        )
        .bind(job_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(EtlJob::try_from).transpose()
    }
}
