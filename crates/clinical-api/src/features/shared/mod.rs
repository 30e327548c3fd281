//! Shared utilities for feature modules
//!
//! - **validation**: input normalization and date filter parsing
//! - **test_helpers**: in-memory fakes of the store and ETL service (test-only)

pub mod validation;

#[cfg(test)]
pub mod test_helpers;

pub use validation::{non_blank, parse_date_bound};
