//! Machine Learning Module
//!
//! Everything between raw observations and a served prediction:
//! - Feature building and inverter id encoding
//! - Random forest training with a held-out evaluation split
//! - Versioned model artifact persistence
//! - The prediction service used by the front-ends
//!
//! # Architecture
//! Training is an offline batch step (`features` → `training` → `store::save`).
//! Serving loads the artifact once into an immutable [`inference::ModelContext`]
//! and answers requests through [`inference::PowerPredictor`].

use serde::{Deserialize, Serialize};

pub mod encoder;
pub mod features;
pub mod forest;
pub mod inference;
pub mod store;
pub mod training;

pub use encoder::CategoryEncoder;
pub use features::{EncodedDataset, FeatureBuilder, FEATURE_NAMES};
pub use forest::{ForestParams, PowerForest};
pub use inference::{ModelContext, PowerPredictor, PredictionService};
pub use store::ModelStore;
pub use training::{ModelTrainer, TrainedModel, TrainingConfig, TrainingDataset};

/// ML Model Type
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ModelType {
    RandomForest,
}

/// ML Model Metadata
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelMetadata {
    pub model_id: String,
    pub model_type: ModelType,
    /// Crate version that wrote the model
    pub version: String,
    pub trained_at: chrono::DateTime<chrono::Utc>,
    pub training_samples: usize,
    /// Rows held out from fitting and used for `validation_metrics`
    pub test_samples: usize,
    pub validation_metrics: ValidationMetrics,
    pub feature_names: Vec<String>,
    /// Seed the run used, drawn at random when none was configured
    pub seed: u64,
    /// Whether `seed` came from configuration
    pub reproducible: bool,
    pub params: ForestParams,
    /// Largest AC power in the training data (kW)
    pub max_observed_power_kw: f64,
}

/// Validation Metrics
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ValidationMetrics {
    pub mae: f64,  // Mean Absolute Error
    pub rmse: f64, // Root Mean Square Error
    pub mape: f64, // Mean Absolute Percentage Error
    pub r2: f64,   // R-squared
}

impl ValidationMetrics {
    pub fn new(mae: f64, rmse: f64, mape: f64, r2: f64) -> Self {
        Self {
            mae,
            rmse,
            mape,
            r2,
        }
    }
}
