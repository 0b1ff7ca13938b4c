use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;

use super::AppState;

/// Readiness response
#[derive(Debug, Serialize)]
pub struct ReadinessResponse {
    status: String,
    timestamp: chrono::DateTime<chrono::Utc>,
    model: ComponentHealth,
}

/// Health status of a component
#[derive(Debug, Serialize)]
pub struct ComponentHealth {
    status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    model_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    inverters: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl ComponentHealth {
    fn healthy(model_id: String, inverters: usize) -> Self {
        Self {
            status: "healthy".to_string(),
            model_id: Some(model_id),
            inverters: Some(inverters),
            error: None,
        }
    }

    fn unhealthy(error: String) -> Self {
        Self {
            status: "unhealthy".to_string(),
            model_id: None,
            inverters: None,
            error: Some(error),
        }
    }
}

fn check_model(state: &AppState) -> ComponentHealth {
    let inverters = state.predictor.inverter_ids().len();
    if inverters == 0 {
        return ComponentHealth::unhealthy("model knows no inverters".to_string());
    }
    ComponentHealth::healthy(state.predictor.metadata().model_id, inverters)
}

/// GET /health/ready - Readiness probe
///
/// Returns 200 once a model is loaded and can answer predictions
pub async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    let model = check_model(&state);
    let ready = model.status == "healthy";

    let response = ReadinessResponse {
        status: if ready { "ready" } else { "not_ready" }.to_string(),
        timestamp: chrono::Utc::now(),
        model,
    };

    let status_code = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(response))
}

/// GET /health/live - Liveness probe
///
/// Returns 200 if the application is running
pub async fn liveness_check() -> impl IntoResponse {
    StatusCode::OK
}
