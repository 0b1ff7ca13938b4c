//! SmartCore RandomForest Wrapper
//!
//! The ensemble is fitted as `ensemble_members` independently seeded
//! smartcore forests that share the tree budget. The prediction is the mean
//! of the member means. smartcore keeps its trees private, so the standard
//! deviation across members serves as the uncertainty proxy.

use rand::{rngs::StdRng, RngCore, SeedableRng};
use serde::{Deserialize, Serialize};
use smartcore::ensemble::random_forest_regressor::{
    RandomForestRegressor, RandomForestRegressorParameters,
};
use smartcore::linalg::basic::matrix::DenseMatrix;
use tracing::debug;

use crate::error::{PredictorError, Result};

type Forest = RandomForestRegressor<f64, f64, DenseMatrix<f64>, Vec<f64>>;

/// Forest hyperparameters
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ForestParams {
    /// Total number of trees across all members
    pub n_trees: usize,
    pub max_depth: Option<u16>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Features considered per split; `None` leaves smartcore's default (sqrt of the feature count)
    pub max_features: Option<usize>,
    pub ensemble_members: usize,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_depth: Some(15),
            min_samples_split: 5,
            min_samples_leaf: 1,
            max_features: None,
            ensemble_members: 4,
        }
    }
}

impl ForestParams {
    pub fn members(&self) -> usize {
        self.ensemble_members.clamp(1, self.n_trees.max(1))
    }

    pub fn trees_per_member(&self) -> usize {
        self.n_trees.max(1).div_ceil(self.members())
    }

    fn member_parameters(&self, seed: u64) -> RandomForestRegressorParameters {
        RandomForestRegressorParameters {
            max_depth: self.max_depth,
            min_samples_leaf: self.min_samples_leaf,
            min_samples_split: self.min_samples_split,
            n_trees: self.trees_per_member(),
            m: self.max_features,
            keep_samples: false, // Don't store training samples (saves memory)
            seed,
        }
    }
}

/// Fitted forest ensemble
#[derive(Serialize, Deserialize)]
pub struct PowerForest {
    members: Vec<Forest>,
}

impl std::fmt::Debug for PowerForest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PowerForest")
            .field("members", &self.members.len())
            .finish()
    }
}

impl PowerForest {
    /// Train the ensemble. Member seeds are drawn from `seed`, so the same
    /// seed and data give the same forest.
    pub fn fit(x: &[Vec<f64>], y: &[f64], params: &ForestParams, seed: u64) -> Result<Self> {
        if params.n_trees == 0 || params.ensemble_members == 0 {
            return Err(PredictorError::Training(format!(
                "n_trees and ensemble_members must be at least 1 (got {} and {})",
                params.n_trees, params.ensemble_members
            )));
        }

        if x.is_empty() || y.is_empty() {
            return Err(PredictorError::Training(
                "cannot train on empty dataset".to_string(),
            ));
        }

        if x.len() != y.len() {
            return Err(PredictorError::Training(format!(
                "feature and target count mismatch: {} features, {} targets",
                x.len(),
                y.len()
            )));
        }

        let x_matrix = to_matrix(x).map_err(PredictorError::Training)?;
        let y_vec = y.to_vec();

        let mut seeds = StdRng::seed_from_u64(seed);
        let members = (0..params.members())
            .map(|member| {
                let member_seed = seeds.next_u64();
                debug!(
                    member,
                    seed = member_seed,
                    trees = params.trees_per_member(),
                    "fitting forest member"
                );
                Forest::fit(&x_matrix, &y_vec, params.member_parameters(member_seed)).map_err(
                    |e| PredictorError::Training(format!("RandomForest training failed: {:?}", e)),
                )
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { members })
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    /// Ensemble mean for each row
    pub fn predict(&self, x: &[Vec<f64>]) -> Result<Vec<f64>> {
        let per_member = self.member_predictions(x)?;
        let n = per_member.len() as f64;

        Ok((0..x.len())
            .map(|row| per_member.iter().map(|p| p[row]).sum::<f64>() / n)
            .collect())
    }

    /// Ensemble mean and the standard deviation across members for one row
    pub fn predict_with_spread(&self, row: &[f64]) -> Result<(f64, Option<f64>)> {
        let per_member = self.member_predictions(&[row.to_vec()])?;
        let values: Vec<f64> = per_member.iter().map(|p| p[0]).collect();

        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let spread = if values.len() > 1 {
            let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
            Some(variance.sqrt())
        } else {
            None
        };

        Ok((mean, spread))
    }

    fn member_predictions(&self, x: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
        if self.members.is_empty() {
            return Err(PredictorError::Inference("forest has no members".to_string()));
        }

        let x_matrix = to_matrix(x).map_err(PredictorError::Inference)?;
        self.members
            .iter()
            .map(|member| {
                let predictions = member
                    .predict(&x_matrix)
                    .map_err(|e| PredictorError::Inference(format!("{:?}", e)))?;
                if predictions.len() != x.len() {
                    return Err(PredictorError::Inference(format!(
                        "model returned {} predictions for {} rows",
                        predictions.len(),
                        x.len()
                    )));
                }
                Ok(predictions)
            })
            .collect()
    }
}

/// Row-major feature rows into a smartcore matrix
fn to_matrix(x: &[Vec<f64>]) -> std::result::Result<DenseMatrix<f64>, String> {
    let n_samples = x.len();
    let n_features = x.first().map(Vec::len).unwrap_or(0);
    if n_samples == 0 || n_features == 0 {
        return Err("no feature rows".to_string());
    }

    let mut flat_data = Vec::with_capacity(n_samples * n_features);
    for row in x {
        if row.len() != n_features {
            return Err(format!(
                "all feature vectors must have the same length ({} vs {})",
                row.len(),
                n_features
            ));
        }
        flat_data.extend_from_slice(row);
    }

    Ok(DenseMatrix::new(n_samples, n_features, flat_data, false))
}
