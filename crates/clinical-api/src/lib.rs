//! Clinical Data API Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]
//!
//! HTTP façade over the clinical measurement store and the external ETL
//! job-execution service.
//!
//! # Overview
//!
//! - **Measurements**: filtered, read-only queries over `clinical_measurements`
//! - **ETL jobs**: submit files for processing and track the resulting jobs
//! - **Health**: database and ETL service reachability
//!
//! # Architecture
//!
//! Each feature is a vertical slice under [`features`] with a persistence
//! gateway behind a trait, so handlers and the job lifecycle can be exercised
//! against in-memory implementations.
//!
//! The job lifecycle lives in [`features::etl_jobs::manager`]: a job is
//! recorded as `pending`, handed to the ETL service and marked `running` or
//! `failed` depending on the hand-off. Status requests poll the ETL service
//! and write whatever it reports back into the local record. When the ETL
//! service is unreachable the stored status is returned instead; database
//! failures are always surfaced.
//!
//! ## Framework Stack
//!
//! - **Axum**: web framework
//! - **SQLx**: PostgreSQL access with bound parameters
//! - **Reqwest**: ETL service client
//! - **Tower**: middleware and service abstractions
//!
//! # Example
//!
//! ```no_run
//! use clinical_api::{config::Config, db};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load()?;
//!     let pool = db::create_pool(&config.database).await?;
//!     db::health_check(&pool).await?;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod features;
pub mod middleware;

pub use api::{create_router, AppState};
pub use config::Config;
pub use error::{AppError, AppResult};
