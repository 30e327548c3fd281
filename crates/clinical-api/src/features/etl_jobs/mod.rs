//! ETL jobs feature module
//!
//! Submission of files to the external ETL service and tracking of the
//! resulting jobs.
//!
//! - `types` - job record, status and snapshot types
//! - `store` - `etl_jobs` persistence
//! - `client` - HTTP client for the ETL service
//! - `manager` - lifecycle and status reconciliation
//! - `routes` - HTTP endpoints

pub mod client;
pub mod manager;
pub mod routes;
pub mod store;
pub mod types;


pub use client::{EtlOrchestrator, EtlServiceClient, OrchestrationError};
pub use manager::{JobLifecycleManager, ReconcilePolicy};
pub use routes::{etl_routes, JobState};
pub use store::{JobStore, PgJobStore};
pub use types::{EtlJob, JobError, JobResult, JobStatus, JobStatusSnapshot};
