//! Feature modules implementing the clinical data API
//!
//! Each feature is a vertical slice with its own types, persistence gateway
//! and routes.
//!
//! # Features
//!
//! - **etl_jobs**: submission and status tracking of ETL jobs
//! - **measurements**: filtered queries over processed clinical measurements

pub mod etl_jobs;
pub mod measurements;
pub mod shared;

use axum::Router;
use std::sync::Arc;

use etl_jobs::JobLifecycleManager;
use measurements::MeasurementStore;

/// Shared state for all feature routes
#[derive(Clone)]
pub struct FeatureState {
    pub jobs: Arc<JobLifecycleManager>,
    pub measurements: Arc<dyn MeasurementStore>,
}

/// Creates the API router with all feature routes mounted
///
/// - `/etl` - ETL job submission and status
/// - `/data` - clinical measurement queries
pub fn router(state: FeatureState) -> Router<()> {
    Router::new()
        .nest("/etl", etl_jobs::etl_routes().with_state(state.jobs))
        .nest("/data", measurements::data_routes().with_state(state.measurements))
}
