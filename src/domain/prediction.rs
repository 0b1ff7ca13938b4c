use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::TimeFeatures;

/// Inclusive physical bounds accepted by the prediction service
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InputLimits {
    pub ambient_min_c: f64,
    pub ambient_max_c: f64,
    pub module_min_c: f64,
    pub module_max_c: f64,
    pub irradiation_min: f64,
    pub irradiation_max: f64,
}

impl Default for InputLimits {
    fn default() -> Self {
        Self {
            ambient_min_c: -20.0,
            ambient_max_c: 80.0,
            module_min_c: -20.0,
            module_max_c: 80.0,
            irradiation_min: 0.0,
            irradiation_max: 1.5,
        }
    }
}

/// A single feature vector as entered by a user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRequest {
    /// Ambient temperature (°C)
    pub ambient_temperature: f64,
    /// Module temperature (°C)
    pub module_temperature: f64,
    /// Irradiation (kW/m²)
    pub irradiation: f64,
    /// Raw inverter id, encoded by the model's encoder
    pub inverter_id: String,
    pub hour: u32,
    pub day_of_year: u32,
    /// 0=Monday, 6=Sunday
    pub weekday: u32,
}

impl PredictionRequest {
    /// Build a request whose time features come from `at`
    pub fn at(
        ambient_temperature: f64,
        module_temperature: f64,
        irradiation: f64,
        inverter_id: impl Into<String>,
        at: &NaiveDateTime,
    ) -> Self {
        let time = TimeFeatures::from_timestamp(at);
        Self {
            ambient_temperature,
            module_temperature,
            irradiation,
            inverter_id: inverter_id.into(),
            hour: time.hour,
            day_of_year: time.day_of_year,
            weekday: time.weekday,
        }
    }

    pub fn time_features(&self) -> TimeFeatures {
        TimeFeatures {
            hour: self.hour,
            day_of_year: self.day_of_year,
            weekday: self.weekday,
        }
    }
}

/// Predicted AC power
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    /// Ensemble mean, clamped to be non-negative (kW)
    pub power_kw: f64,
    /// Standard deviation across the ensemble members (kW), when there are several
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spread_kw: Option<f64>,
}

impl PredictionResult {
    pub fn formatted(&self) -> String {
        format!("{:.2} kW", self.power_kw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_request_derives_time_features() {
        // Saturday
        let at = NaiveDate::from_ymd_opt(2020, 5, 16)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap();
        let request = PredictionRequest::at(25.0, 40.0, 0.5, "1BY6WEcLGh8j5v7", &at);

        assert_eq!(request.hour, 9);
        assert_eq!(request.weekday, 5);
        assert_eq!(request.day_of_year, 137);
        assert_eq!(request.time_features().hour, 9);
    }

    #[test]
    fn test_result_formatting() {
        let result = PredictionResult {
            power_kw: 812.456,
            spread_kw: None,
        };
        assert_eq!(result.formatted(), "812.46 kW");
    }

    #[test]
    fn test_default_limits() {
        let limits = InputLimits::default();
        assert_eq!(limits.irradiation_max, 1.5);
        assert_eq!(limits.irradiation_min, 0.0);
        assert!(limits.ambient_min_c < limits.ambient_max_c);
    }
}
