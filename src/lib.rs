//! Solar inverter AC power prediction.
//!
//! CSV ingestion, random forest training, a versioned model artifact, and
//! web/terminal front-ends over one prediction service.

pub mod api;
pub mod commands;
pub mod config;
#[cfg(feature = "desktop")]
pub mod desktop;
pub mod domain;
pub mod error;
pub mod frontend;
pub mod ingest;
pub mod ml;
pub mod telemetry;

pub use error::{PredictorError, Result};
