//! ETL orchestration client
//!
//! HTTP client for the external job-execution service:
//!
//! - `POST {base}/jobs` with `{jobId, filename, studyId?}`
//! - `GET {base}/jobs/{id}/status` returning `{status, progress?, message?}`
//! - `GET {base}/health`
//!
//! Every call is a single attempt. Failures are reported to the caller, who
//! decides on a fallback.

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

use super::types::JobStatusSnapshot;
use crate::config::EtlServiceConfig;

/// The ETL service could not be reached or answered with an error
#[derive(Debug, Error)]
pub enum OrchestrationError {
    /// Connection or timeout failure
    #[error("ETL service request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("ETL service responded with {status}: {body}")]
    Status { status: StatusCode, body: String },

    /// 2xx response whose body is not a recognizable status report
    #[error("ETL service returned an unrecognized response: {0}")]
    UnexpectedResponse(String),
}

impl OrchestrationError {
    /// The service answered, so the failure is in what it said rather than
    /// in reaching it
    pub fn is_unexpected_response(&self) -> bool {
        matches!(self, OrchestrationError::UnexpectedResponse(_))
    }
}

/// Operations the lifecycle manager needs from the ETL service
#[async_trait]
pub trait EtlOrchestrator: Send + Sync {
    async fn submit(
        &self,
        job_id: &str,
        filename: &str,
        study_id: Option<&str>,
    ) -> Result<(), OrchestrationError>;

    async fn fetch_status(&self, job_id: &str) -> Result<JobStatusSnapshot, OrchestrationError>;

    /// `true` when the service answers its health endpoint with a 2xx
    async fn health_check(&self) -> bool;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SubmitJobRequest<'a> {
    job_id: &'a str,
    filename: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    study_id: Option<&'a str>,
}

/// reqwest-backed [`EtlOrchestrator`]
#[derive(Debug, Clone)]
pub struct EtlServiceClient {
    client: Client,
    base_url: String,
}

impl EtlServiceClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, OrchestrationError> {
        let client = Client::builder().timeout(timeout).build()?;
        let base_url = base_url.into().trim_end_matches('/').to_string();

        Ok(Self { client, base_url })
    }

    pub fn from_config(config: &EtlServiceConfig) -> Result<Self, OrchestrationError> {
        Self::new(&config.base_url, Duration::from_secs(config.timeout_secs))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn jobs_url(&self) -> String {
        format!("{}/jobs", self.base_url)
    }

    fn status_url(&self, job_id: &str) -> String {
        format!("{}/jobs/{}/status", self.base_url, job_id)
    }

    fn health_url(&self) -> String {
        format!("{}/health", self.base_url)
    }
}

async fn ensure_success(response: Response) -> Result<Response, OrchestrationError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(OrchestrationError::Status { status, body })
}

#[async_trait]
impl EtlOrchestrator for EtlServiceClient {
    #[tracing::instrument(skip(self, filename, study_id))]
    async fn submit(
        &self,
        job_id: &str,
        filename: &str,
        study_id: Option<&str>,
    ) -> Result<(), OrchestrationError> {
        let request = SubmitJobRequest {
            job_id,
            filename,
            study_id,
        };

        let response = self.client.post(self.jobs_url()).json(&request).send().await?;
        ensure_success(response).await?;

        tracing::debug!("Job accepted by ETL service");
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn fetch_status(&self, job_id: &str) -> Result<JobStatusSnapshot, OrchestrationError> {
        let response = self.client.get(self.status_url(job_id)).send().await?;
        let snapshot = ensure_success(response)
            .await?
            .json()
            .await
            .map_err(|e| {
                if e.is_decode() {
                    OrchestrationError::UnexpectedResponse(e.to_string())
                } else {
                    OrchestrationError::Request(e)
                }
            })?;
        Ok(snapshot)
    }

    async fn health_check(&self) -> bool {
        match self.client.get(self.health_url()).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                tracing::debug!(error = %e, "ETL service health check failed");
                false
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::etl_jobs::types::JobStatus;
    use serde_json::json;
    use wiremock::{
        matchers::{body_json, method, path},
        Mock, MockServer, ResponseTemplate,
    };

    fn client_for(server: &MockServer) -> EtlServiceClient {
        EtlServiceClient::new(server.uri(), Duration::from_secs(2)).unwrap()
    }

    #[test]
    fn test_trailing_slash_is_trimmed() {
        let client = EtlServiceClient::new("http://etl:8000/", Duration::from_secs(1)).unwrap();
        assert_eq!(client.base_url(), "http://etl:8000");
        assert_eq!(client.status_url("j1"), "http://etl:8000/jobs/j1/status");
    }

    #[tokio::test]
    async fn test_submit_posts_job_description() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/jobs"))
            .and(body_json(json!({
                "jobId": "j1",
                "filename": "file.csv",
                "studyId": "study1"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jobId": "j1",
                "status": "running",
                "message": "Job submitted successfully"
            })))
            .expect(1)
            .mount(&server)
            .await;

        client_for(&server)
            .submit("j1", "file.csv", Some("study1"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_submit_omits_missing_study_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/jobs"))
            .and(body_json(json!({"jobId": "j2", "filename": "file.csv"})))
            .respond_with(ResponseTemplate::new(202))
            .expect(1)
            .mount(&server)
            .await;

        assert!(client_for(&server).submit("j2", "file.csv", None).await.is_ok());
    }

    #[tokio::test]
    async fn test_submit_non_success_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/jobs"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let err = client_for(&server).submit("j1", "f.csv", None).await.unwrap_err();
        match err {
            OrchestrationError::Status { status, body } => {
                assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
                assert_eq!(body, "boom");
            },
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_submit_unreachable_is_error() {
        let client = EtlServiceClient::new("http://127.0.0.1:1", Duration::from_secs(1)).unwrap();
        let err = client.submit("j1", "f.csv", None).await.unwrap_err();
        assert!(matches!(err, OrchestrationError::Request(_)));
    }

    #[tokio::test]
    async fn test_fetch_status_decodes_payload() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/jobs/j1/status"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jobId": "j1",
                "status": "completed",
                "progress": 100,
                "message": "done"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let snapshot = client_for(&server).fetch_status("j1").await.unwrap();
        assert_eq!(snapshot.status, JobStatus::Completed);
        assert_eq!(snapshot.progress, Some(100.0));
        assert_eq!(snapshot.message.as_deref(), Some("done"));
    }

    #[tokio::test]
    async fn test_fetch_status_not_found_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/jobs/j9/status"))
            .respond_with(
                ResponseTemplate::new(404).set_body_json(json!({"detail": "Job not found"})),
            )
            .mount(&server)
            .await;

        let err = client_for(&server).fetch_status("j9").await.unwrap_err();
        assert!(matches!(
            err,
            OrchestrationError::Status { status: StatusCode::NOT_FOUND, .. }
        ));
    }

    #[tokio::test]
    async fn test_fetch_status_unknown_status_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/jobs/j1/status"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "paused"})))
            .mount(&server)
            .await;

        let err = client_for(&server).fetch_status("j1").await.unwrap_err();
        assert!(err.is_unexpected_response(), "unexpected error: {err:?}");
    }

    #[tokio::test]
    async fn test_fetch_status_non_json_body_is_unexpected_response() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/jobs/j1/status"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>gateway</html>"))
            .mount(&server)
            .await;

        let err = client_for(&server).fetch_status("j1").await.unwrap_err();
        assert!(err.is_unexpected_response(), "unexpected error: {err:?}");
    }

    #[tokio::test]
    async fn test_fetch_status_timeout_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/jobs/j1/status"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"status": "running"}))
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&server)
            .await;

        let client = EtlServiceClient::new(server.uri(), Duration::from_millis(200)).unwrap();
        let err = client.fetch_status("j1").await.unwrap_err();
        match err {
            OrchestrationError::Request(e) => assert!(e.is_timeout()),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_health_check() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "healthy"})))
            .mount(&server)
            .await;

        assert!(client_for(&server).health_check().await);

        let offline = EtlServiceClient::new("http://127.0.0.1:1", Duration::from_secs(1)).unwrap();
        assert!(!offline.health_check().await);
    }
}
