//! Clinical Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared ambient concerns for the clinical data workspace members.
//!
//! # Overview
//!
//! - **Logging**: `tracing` subscriber configuration and initialization
//!
//! # Example
//!
//! ```no_run
//! use clinical_common::logging::{init_logging, LogConfig};
//!
//! fn main() -> anyhow::Result<()> {
//!     let _guard = init_logging(&LogConfig::from_env()?)?;
//!     tracing::info!("ready");
//!     Ok(())
//! }
//! ```

pub mod logging;

pub use logging::{init_logging, LogConfig, LoggingGuard};
