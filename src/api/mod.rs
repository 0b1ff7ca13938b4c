pub mod error;
pub mod form;
pub mod health;
pub mod predict;
pub mod response;

use axum::{
    routing::{get, post},
    Router,
};
use chrono::NaiveDateTime;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::{config::ServerConfig, ml::PowerPredictor};

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub predictor: Arc<dyn PowerPredictor>,
    /// Source of "now" for requests that carry no date-time
    pub clock: fn() -> NaiveDateTime,
}

impl AppState {
    pub fn new(predictor: Arc<dyn PowerPredictor>) -> Self {
        Self {
            predictor,
            clock: local_now,
        }
    }
}

/// Plant-local wall clock
pub fn local_now() -> NaiveDateTime {
    chrono::Local::now().naive_local()
}

fn v1_router() -> Router<AppState> {
    Router::new()
        .route("/predict", post(predict::predict))
        .route("/inverters", get(predict::list_inverters))
        .route("/model", get(predict::model_info))
}

pub fn router(state: AppState, cfg: &ServerConfig) -> Router {
    Router::new()
        .route("/", get(form::index))
        .route("/predict", post(form::submit))
        .route("/health/live", get(health::liveness_check))
        .route("/health/ready", get(health::readiness_check))
        .nest("/api/v1", v1_router())
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(axum::extract::DefaultBodyLimit::max(64 * 1024))
                .layer(TimeoutLayer::new(Duration::from_secs(cfg.request_timeout_secs)))
        )
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{InputLimits, PredictionResult};
    use crate::error::PredictorError;
    use crate::ml::inference::MockPowerPredictor;
    use crate::ml::{ForestParams, ModelMetadata, ModelType, ValidationMetrics, FEATURE_NAMES};
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
    };
    use chrono::NaiveDate;
    use tower::ServiceExt;

    fn metadata() -> ModelMetadata {
        ModelMetadata {
            model_id: "random_forest_test".to_string(),
            model_type: ModelType::RandomForest,
            version: "0.1.0".to_string(),
            trained_at: chrono::Utc::now(),
            training_samples: 800,
            test_samples: 200,
            validation_metrics: ValidationMetrics::new(21.5, 40.2, 9.1, 0.97),
            feature_names: FEATURE_NAMES.iter().map(|s| s.to_string()).collect(),
            seed: 42,
            reproducible: true,
            params: ForestParams::default(),
            max_observed_power_kw: 1400.0,
        }
    }

    fn fixed_clock() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2020, 6, 28)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    /// Mirrors the real service's irradiation bound and unknown-id handling
    fn app() -> Router {
        let mut mock = MockPowerPredictor::new();
        mock.expect_predict().returning(|req| {
            if req.irradiation > 1.5 {
                return Err(PredictorError::validation("irradiation", "1.6 is above the maximum 1.5"));
            }
            if req.inverter_id != "1BY6WEcLGh8j5v7" {
                return Err(PredictorError::UnknownCategory(req.inverter_id.clone()));
            }
            Ok(PredictionResult {
                power_kw: 812.3456,
                spread_kw: Some(14.0),
            })
        });
        mock.expect_inverter_ids()
            .returning(|| vec!["1BY6WEcLGh8j5v7".to_string(), "zBIq5rxdHJRwDNY".to_string()]);
        mock.expect_metadata().returning(metadata);
        mock.expect_limits().returning(InputLimits::default);

        let state = AppState {
            predictor: Arc::new(mock),
            clock: fixed_clock,
        };
        router(state, &ServerConfig::default())
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn body_text(response: axum::response::Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn json_post(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_predict_json() {
        let response = app()
            .oneshot(json_post(
                "/api/v1/predict",
                serde_json::json!({
                    "inverter_id": "1BY6WEcLGh8j5v7",
                    "ambient_temperature": 30.0,
                    "module_temperature": 45.0,
                    "irradiation": 0.85,
                    "hour": 12,
                    "day_of_year": 180,
                    "weekday": 2
                }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["success"], true);
        assert_eq!(json["data"]["formatted"], "812.35 kW");
        assert_eq!(json["data"]["spread_kw"], 14.0);
        assert_eq!(json["data"]["request"]["weekday"], 2);
        assert_eq!(json["metadata"]["model_id"], "random_forest_test");
    }

    #[tokio::test]
    async fn test_predict_uses_clock_for_missing_time() {
        let response = app()
            .oneshot(json_post(
                "/api/v1/predict",
                serde_json::json!({
                    "inverter_id": "1BY6WEcLGh8j5v7",
                    "ambient_temperature": 30.0,
                    "module_temperature": 45.0,
                    "irradiation": 0.85
                }),
            ))
            .await
            .unwrap();

        let json = body_json(response).await;
        assert_eq!(json["data"]["request"]["day_of_year"], 180);
        assert_eq!(json["data"]["request"]["weekday"], 6);
    }

    #[tokio::test]
    async fn test_out_of_range_is_400_with_field() {
        let response = app()
            .oneshot(json_post(
                "/api/v1/predict",
                serde_json::json!({
                    "inverter_id": "1BY6WEcLGh8j5v7",
                    "ambient_temperature": 30.0,
                    "module_temperature": 45.0,
                    "irradiation": 1.6
                }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["error"], "ValidationError");
        assert_eq!(json["field"], "irradiation");
    }

    #[tokio::test]
    async fn test_missing_json_field_is_400_with_field() {
        let response = app()
            .oneshot(json_post(
                "/api/v1/predict",
                serde_json::json!({
                    "inverter_id": "1BY6WEcLGh8j5v7",
                    "ambient_temperature": 30.0,
                    "module_temperature": 45.0
                }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["error"], "ValidationError");
        assert_eq!(json["field"], "irradiation");
    }

    #[tokio::test]
    async fn test_malformed_json_is_400() {
        let response = app()
            .oneshot(
                Request::post("/api/v1/predict")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from("{\"inverter_id\": "))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"], "ValidationError");
    }

    #[tokio::test]
    async fn test_derive_validation_is_400() {
        let response = app()
            .oneshot(json_post(
                "/api/v1/predict",
                serde_json::json!({
                    "inverter_id": "1BY6WEcLGh8j5v7",
                    "ambient_temperature": 30.0,
                    "module_temperature": 45.0,
                    "irradiation": 0.5,
                    "hour": 25
                }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["field"], "hour");
    }

    #[tokio::test]
    async fn test_unknown_inverter_is_404() {
        let response = app()
            .oneshot(json_post(
                "/api/v1/predict",
                serde_json::json!({
                    "inverter_id": "NOT_AN_INVERTER",
                    "ambient_temperature": 30.0,
                    "module_temperature": 45.0,
                    "irradiation": 0.5
                }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let json = body_json(response).await;
        assert_eq!(json["error"], "UnknownInverter");
        assert_eq!(json["field"], "inverter_id");
    }

    #[tokio::test]
    async fn test_list_inverters() {
        let response = app()
            .oneshot(Request::get("/api/v1/inverters").body(Body::empty()).unwrap())
            .await
            .unwrap();

        let json = body_json(response).await;
        assert_eq!(json["data"][0], "1BY6WEcLGh8j5v7");
        assert_eq!(json["metadata"]["total_count"], 2);
    }

    #[tokio::test]
    async fn test_model_info() {
        let response = app()
            .oneshot(Request::get("/api/v1/model").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["data"]["model_id"], "random_forest_test");
        assert_eq!(json["data"]["n_trees"], 100);
        assert_eq!(json["data"]["inverters"], 2);
        assert_eq!(json["data"]["limits"]["irradiation_max"], 1.5);
    }

    #[tokio::test]
    async fn test_form_page_lists_inverters() {
        let response = app()
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let html = body_text(response).await;
        assert!(html.contains(r#"<option value="zBIq5rxdHJRwDNY">"#));
        assert!(html.contains("2020-06-28 12:00"));
        assert!(html.contains("random_forest_test"));
    }

    #[tokio::test]
    async fn test_form_submit_renders_prediction() {
        let form = "inverter_id=1BY6WEcLGh8j5v7&ambient_temperature=30&module_temperature=45&irradiation=0.85&date_time=2020-06-28+12%3A00";
        let response = app()
            .oneshot(
                Request::post("/predict")
                    .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(Body::from(form))
                    .unwrap(),
            )
            .await
            .unwrap();

        let html = body_text(response).await;
        assert!(html.contains("812.35 kW"));
        assert!(html.contains("Prediction details"));
    }

    #[tokio::test]
    async fn test_form_submit_shows_field_error() {
        let form = "inverter_id=1BY6WEcLGh8j5v7&ambient_temperature=hot&module_temperature=45&irradiation=0.85&date_time=";
        let response = app()
            .oneshot(
                Request::post("/predict")
                    .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(Body::from(form))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let html = body_text(response).await;
        assert!(html.contains("ValidationError"));
        assert!(html.contains("invalid ambient_temperature"));
        assert!(!html.contains("Prediction details"));
    }

    #[tokio::test]
    async fn test_health_probes() {
        let live = app()
            .oneshot(Request::get("/health/live").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(live.status(), StatusCode::OK);

        let ready = app()
            .oneshot(Request::get("/health/ready").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(ready.status(), StatusCode::OK);
        assert_eq!(body_json(ready).await["model"]["inverters"], 2);
    }
}
