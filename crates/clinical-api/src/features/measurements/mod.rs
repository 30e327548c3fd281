//! Measurements feature module
//!
//! Filtered, read-only queries over `clinical_measurements`.

pub mod routes;
pub mod store;
pub mod types;


pub use routes::{data_routes, MeasurementState};
pub use store::{MeasurementStore, PgMeasurementStore};
pub use types::{ClinicalMeasurement, DataQuery, MeasurementError, MeasurementFilters};
