//! ML Model Inference
//!
//! The loaded model and encoder live in an immutable [`ModelContext`]. The
//! front-ends only see the [`PowerPredictor`] trait.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use super::features::feature_row;
use super::{CategoryEncoder, ModelMetadata, ModelStore, TrainedModel};
use crate::domain::{InputLimits, PredictionRequest, PredictionResult};
use crate::error::{PredictorError, Result};

/// What a front-end needs from a trained model
#[cfg_attr(test, mockall::automock)]
pub trait PowerPredictor: Send + Sync {
    /// Validate, encode and predict one request
    fn predict(&self, request: &PredictionRequest) -> Result<PredictionResult>;

    /// Inverter ids known to the model, sorted
    fn inverter_ids(&self) -> Vec<String>;

    fn metadata(&self) -> ModelMetadata;

    fn limits(&self) -> InputLimits;
}

/// Model and encoder loaded once, read-only afterwards
#[derive(Debug)]
pub struct ModelContext {
    pub model: TrainedModel,
    pub encoder: CategoryEncoder,
    /// Artifact the context was loaded from, if any
    pub source: Option<PathBuf>,
}

impl ModelContext {
    pub fn new(model: TrainedModel, encoder: CategoryEncoder) -> Self {
        Self {
            model,
            encoder,
            source: None,
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let (model, encoder) = ModelStore::load(path)?;
        info!(
            path = %path.display(),
            model_id = %model.metadata.model_id,
            trained_at = %model.metadata.trained_at,
            inverters = encoder.len(),
            "model loaded"
        );
        Ok(Self {
            model,
            encoder,
            source: Some(path.to_path_buf()),
        })
    }
}

/// Stateless prediction over a shared [`ModelContext`]
#[derive(Debug, Clone)]
pub struct PredictionService {
    context: Arc<ModelContext>,
    limits: InputLimits,
}

impl PredictionService {
    pub fn new(context: Arc<ModelContext>, limits: InputLimits) -> Self {
        Self { context, limits }
    }

    fn validate(&self, request: &PredictionRequest) -> Result<()> {
        let l = &self.limits;
        check_range(
            "ambient_temperature",
            request.ambient_temperature,
            l.ambient_min_c,
            l.ambient_max_c,
        )?;
        check_range(
            "module_temperature",
            request.module_temperature,
            l.module_min_c,
            l.module_max_c,
        )?;
        check_range(
            "irradiation",
            request.irradiation,
            l.irradiation_min,
            l.irradiation_max,
        )?;

        if request.inverter_id.trim().is_empty() {
            return Err(PredictorError::validation("inverter_id", "is required"));
        }
        if request.hour > 23 {
            return Err(PredictorError::validation(
                "hour",
                format!("{} is outside 0..=23", request.hour),
            ));
        }
        if !(1..=366).contains(&request.day_of_year) {
            return Err(PredictorError::validation(
                "day_of_year",
                format!("{} is outside 1..=366", request.day_of_year),
            ));
        }
        if request.weekday > 6 {
            return Err(PredictorError::validation(
                "weekday",
                format!("{} is outside 0..=6", request.weekday),
            ));
        }
        Ok(())
    }
}

fn check_range(field: &'static str, value: f64, min: f64, max: f64) -> Result<()> {
    if !value.is_finite() {
        return Err(PredictorError::validation(field, "must be a finite number"));
    }
    if value < min {
        return Err(PredictorError::validation(
            field,
            format!("{} is below the minimum {}", value, min),
        ));
    }
    if value > max {
        return Err(PredictorError::validation(
            field,
            format!("{} is above the maximum {}", value, max),
        ));
    }
    Ok(())
}

impl PowerPredictor for PredictionService {
    fn predict(&self, request: &PredictionRequest) -> Result<PredictionResult> {
        self.validate(request)?;

        let code = self.context.encoder.encode(request.inverter_id.trim())?;
        let row = feature_row(
            request.ambient_temperature,
            request.module_temperature,
            request.irradiation,
            request.time_features(),
            code,
        );

        let (mean, spread) = self.context.model.forest.predict_with_spread(&row)?;
        let power_kw = mean.max(0.0);

        debug!(
            inverter = %request.inverter_id,
            irradiation = request.irradiation,
            power_kw,
            "prediction"
        );

        Ok(PredictionResult {
            power_kw,
            spread_kw: spread,
        })
    }

    fn inverter_ids(&self) -> Vec<String> {
        self.context.encoder.categories().to_vec()
    }

    fn metadata(&self) -> ModelMetadata {
        self.context.model.metadata.clone()
    }

    fn limits(&self) -> InputLimits {
        self.limits
    }
}
