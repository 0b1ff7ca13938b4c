use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::{error::ApiError, response::ApiResponse, AppState};
use crate::domain::{InputLimits, PredictionRequest};
use crate::frontend::parse_date_time;
use crate::ml::{ModelMetadata, ValidationMetrics};

/// JSON prediction request
///
/// Time features come from `date_time` (or the server clock) unless given
/// explicitly.
#[derive(Debug, Deserialize, Validate)]
pub struct PredictBody {
    #[validate(length(min = 1, max = 64))]
    pub inverter_id: String,
    pub ambient_temperature: f64,
    pub module_temperature: f64,
    pub irradiation: f64,
    /// `YYYY-MM-DD HH:MM`
    pub date_time: Option<String>,
    #[validate(range(max = 23))]
    pub hour: Option<u32>,
    #[validate(range(min = 1, max = 366))]
    pub day_of_year: Option<u32>,
    #[validate(range(max = 6))]
    pub weekday: Option<u32>,
}

impl PredictBody {
    pub fn into_request(self, now: NaiveDateTime) -> Result<PredictionRequest, ApiError> {
        let at = match self.date_time.as_deref().map(str::trim) {
            None | Some("") => now,
            Some(raw) => parse_date_time(raw)?,
        };

        let mut request = PredictionRequest::at(
            self.ambient_temperature,
            self.module_temperature,
            self.irradiation,
            self.inverter_id,
            &at,
        );
        request.hour = self.hour.unwrap_or(request.hour);
        request.day_of_year = self.day_of_year.unwrap_or(request.day_of_year);
        request.weekday = self.weekday.unwrap_or(request.weekday);
        Ok(request)
    }
}

#[derive(Debug, Serialize)]
pub struct PredictResponse {
    pub power_kw: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spread_kw: Option<f64>,
    /// `"{:.2} kW"`
    pub formatted: String,
    /// The feature vector the model saw
    pub request: PredictionRequest,
}

/// POST /api/v1/predict
pub async fn predict(
    State(state): State<AppState>,
    payload: Result<Json<PredictBody>, JsonRejection>,
) -> Result<ApiResponse<PredictResponse>, ApiError> {
    let Json(body) = payload?;
    body.validate()?;
    let request = body.into_request((state.clock)())?;

    let result = state.predictor.predict(&request)?;
    let model_id = state.predictor.metadata().model_id;

    Ok(ApiResponse::success(PredictResponse {
        power_kw: result.power_kw,
        spread_kw: result.spread_kw,
        formatted: result.formatted(),
        request,
    })
    .with_model(model_id))
}

/// GET /api/v1/inverters
pub async fn list_inverters(State(state): State<AppState>) -> ApiResponse<Vec<String>> {
    let ids = state.predictor.inverter_ids();
    let count = ids.len();
    ApiResponse::success(ids).with_count(count)
}

#[derive(Debug, Serialize)]
pub struct ModelInfo {
    pub model_id: String,
    pub trained_at: chrono::DateTime<chrono::Utc>,
    pub version: String,
    pub training_samples: usize,
    pub test_samples: usize,
    pub validation_metrics: ValidationMetrics,
    pub feature_names: Vec<String>,
    pub seed: u64,
    pub reproducible: bool,
    pub n_trees: usize,
    pub ensemble_members: usize,
    pub max_observed_power_kw: f64,
    pub inverters: usize,
    pub limits: InputLimits,
}

impl ModelInfo {
    fn new(metadata: ModelMetadata, inverters: usize, limits: InputLimits) -> Self {
        Self {
            model_id: metadata.model_id,
            trained_at: metadata.trained_at,
            version: metadata.version,
            training_samples: metadata.training_samples,
            test_samples: metadata.test_samples,
            validation_metrics: metadata.validation_metrics,
            feature_names: metadata.feature_names,
            seed: metadata.seed,
            reproducible: metadata.reproducible,
            n_trees: metadata.params.n_trees,
            ensemble_members: metadata.params.members(),
            max_observed_power_kw: metadata.max_observed_power_kw,
            inverters,
            limits,
        }
    }
}

/// GET /api/v1/model
pub async fn model_info(State(state): State<AppState>) -> ApiResponse<ModelInfo> {
    let predictor = &state.predictor;
    ApiResponse::success(ModelInfo::new(
        predictor.metadata(),
        predictor.inverter_ids().len(),
        predictor.limits(),
    ))
}
