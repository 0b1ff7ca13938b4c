//! ML Model Training Pipeline
//!
//! Offline batch step: shuffle-split the encoded table, fit the forest on the
//! training part and score it on the held-out part.

use rand::{rngs::StdRng, seq::SliceRandom, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::features::{feature_names, EncodedDataset};
use super::{ForestParams, ModelMetadata, ModelType, PowerForest, ValidationMetrics};
use crate::error::{PredictorError, Result};

/// Training Dataset
#[derive(Debug, Clone, Default)]
pub struct TrainingDataset {
    pub features: Vec<Vec<f64>>,
    pub targets: Vec<f64>,
}

impl TrainingDataset {
    pub fn new(features: Vec<Vec<f64>>, targets: Vec<f64>) -> Result<Self> {
        if features.len() != targets.len() {
            return Err(PredictorError::Training(format!(
                "Feature and target count mismatch: {} features, {} targets",
                features.len(),
                targets.len()
            )));
        }
        Ok(Self { features, targets })
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Shuffle with `seed` and split into (train, test).
    ///
    /// The test part gets `round(len * test_fraction)` rows, but at least one
    /// row always stays in train. A fraction of 0 yields an empty test part.
    pub fn split(&self, test_fraction: f64, seed: u64) -> Result<(TrainingDataset, TrainingDataset)> {
        if !(0.0..1.0).contains(&test_fraction) {
            return Err(PredictorError::Training(format!(
                "test fraction must be in [0, 1), got {}",
                test_fraction
            )));
        }

        let mut indices: Vec<usize> = (0..self.len()).collect();
        indices.shuffle(&mut StdRng::seed_from_u64(seed));

        let n_test = ((self.len() as f64 * test_fraction).round() as usize)
            .min(self.len().saturating_sub(1));
        let (test_idx, train_idx) = indices.split_at(n_test);

        Ok((self.subset(train_idx), self.subset(test_idx)))
    }

    fn subset(&self, indices: &[usize]) -> TrainingDataset {
        TrainingDataset {
            features: indices.iter().map(|&i| self.features[i].clone()).collect(),
            targets: indices.iter().map(|&i| self.targets[i]).collect(),
        }
    }
}

/// Training Configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrainingConfig {
    pub forest: ForestParams,
    /// Share of rows held out for evaluation
    pub test_fraction: f64,
    /// `None` draws a fresh seed; the run is then not reproducible
    pub seed: Option<u64>,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            forest: ForestParams::default(),
            test_fraction: 0.2,
            seed: Some(42),
        }
    }
}

/// Fitted forest plus what is known about how it was trained
#[derive(Debug, Serialize, Deserialize)]
pub struct TrainedModel {
    pub metadata: ModelMetadata,
    pub forest: PowerForest,
}

/// Model Trainer
pub struct ModelTrainer {
    config: TrainingConfig,
}

impl ModelTrainer {
    pub fn new(config: TrainingConfig) -> Self {
        Self { config }
    }

    /// Fit the forest on `dataset` and evaluate it on the held-out rows
    pub fn train(&self, dataset: &EncodedDataset) -> Result<TrainedModel> {
        if dataset.is_empty() {
            return Err(PredictorError::Training(
                "Cannot train on empty dataset".to_string(),
            ));
        }

        let (seed, reproducible) = match self.config.seed {
            Some(seed) => (seed, true),
            None => {
                let seed = rand::thread_rng().gen::<u64>();
                warn!(seed, "no seed configured, this training run is not reproducible");
                (seed, false)
            }
        };

        let table = TrainingDataset::new(dataset.features(), dataset.targets())?;
        let (train, test) = table.split(self.config.test_fraction, seed)?;

        info!(
            train_rows = train.len(),
            test_rows = test.len(),
            trees = self.config.forest.n_trees,
            members = self.config.forest.members(),
            seed,
            "training random forest"
        );

        let forest = PowerForest::fit(&train.features, &train.targets, &self.config.forest, seed)?;

        // With no held-out rows the fit is scored on its own training data
        let (eval_features, eval_targets) = if test.is_empty() {
            warn!("no rows held out, metrics are computed on the training data");
            (&train.features, &train.targets)
        } else {
            (&test.features, &test.targets)
        };
        let predictions = forest.predict(eval_features)?;
        let metrics = self.calculate_metrics(&predictions, eval_targets)?;

        info!(
            mae = metrics.mae,
            rmse = metrics.rmse,
            mape = metrics.mape,
            r2 = metrics.r2,
            "held-out evaluation"
        );

        let metadata = ModelMetadata {
            model_id: format!("random_forest_{}", uuid::Uuid::new_v4()),
            model_type: ModelType::RandomForest,
            version: env!("CARGO_PKG_VERSION").to_string(),
            trained_at: chrono::Utc::now(),
            training_samples: train.len(),
            test_samples: test.len(),
            validation_metrics: metrics,
            feature_names: feature_names(),
            seed,
            reproducible,
            params: self.config.forest,
            max_observed_power_kw: dataset.max_power_kw(),
        };

        Ok(TrainedModel { metadata, forest })
    }

    /// Calculate validation metrics
    pub fn calculate_metrics(&self, predictions: &[f64], targets: &[f64]) -> Result<ValidationMetrics> {
        if predictions.len() != targets.len() {
            return Err(PredictorError::Training(
                "Prediction and target count mismatch".to_string(),
            ));
        }

        if predictions.is_empty() {
            return Err(PredictorError::Training(
                "No predictions to evaluate".to_string(),
            ));
        }

        let n = predictions.len() as f64;

        // Mean Absolute Error
        let mae: f64 = predictions
            .iter()
            .zip(targets.iter())
            .map(|(p, t)| (p - t).abs())
            .sum::<f64>()
            / n;

        // Root Mean Square Error
        let mse: f64 = predictions
            .iter()
            .zip(targets.iter())
            .map(|(p, t)| (p - t).powi(2))
            .sum::<f64>()
            / n;
        let rmse = mse.sqrt();

        // MAPE over non-zero targets only; night rows have zero output
        let nonzero: Vec<(f64, f64)> = predictions
            .iter()
            .zip(targets.iter())
            .filter(|(_, t)| t.abs() > 1e-10)
            .map(|(p, t)| (*p, *t))
            .collect();
        let mape = if nonzero.is_empty() {
            0.0
        } else {
            nonzero
                .iter()
                .map(|(p, t)| ((p - t) / t).abs() * 100.0)
                .sum::<f64>()
                / nonzero.len() as f64
        };

        // R-squared
        let mean_target: f64 = targets.iter().sum::<f64>() / n;
        let ss_tot: f64 = targets.iter().map(|t| (t - mean_target).powi(2)).sum();
        let ss_res: f64 = predictions
            .iter()
            .zip(targets.iter())
            .map(|(p, t)| (t - p).powi(2))
            .sum();

        let r2 = if ss_tot.abs() < 1e-10 {
            0.0
        } else {
            1.0 - (ss_res / ss_tot)
        };

        Ok(ValidationMetrics::new(mae, rmse, mape, r2))
    }
}
