//! Input handling shared by the web form and the terminal form
//!
//! Both shells collect raw text; [`FormInput::to_request`] turns it into a
//! [`PredictionRequest`] or a validation error naming the field.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::domain::{PredictionRequest, PredictionResult};
use crate::error::{PredictorError, Result};
use crate::ml::ModelMetadata;

/// Layout of the date-time field in both forms
pub const DATE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Raw form fields as typed by the user
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FormInput {
    #[serde(default)]
    pub inverter_id: String,
    #[serde(default)]
    pub ambient_temperature: String,
    #[serde(default)]
    pub module_temperature: String,
    #[serde(default)]
    pub irradiation: String,
    /// Empty means "now"
    #[serde(default)]
    pub date_time: String,
}

impl FormInput {
    /// Parse the fields. `now` is used when no date-time was entered.
    pub fn to_request(&self, now: NaiveDateTime) -> Result<PredictionRequest> {
        let inverter_id = self.inverter_id.trim();
        if inverter_id.is_empty() {
            return Err(PredictorError::validation("inverter_id", "select an inverter"));
        }

        let ambient = parse_number("ambient_temperature", &self.ambient_temperature)?;
        let module = parse_number("module_temperature", &self.module_temperature)?;
        let irradiation = parse_number("irradiation", &self.irradiation)?;

        let at = self.timestamp(now)?;

        Ok(PredictionRequest::at(ambient, module, irradiation, inverter_id, &at))
    }

    /// Entered date-time, or `now` when the field is blank
    pub fn timestamp(&self, now: NaiveDateTime) -> Result<NaiveDateTime> {
        match self.date_time.trim() {
            "" => Ok(now),
            raw => parse_date_time(raw),
        }
    }
}

pub fn parse_date_time(raw: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw.trim(), DATE_TIME_FORMAT).map_err(|_| {
        PredictorError::validation("date_time", format!("'{}' is not in YYYY-MM-DD HH:MM form", raw.trim()))
    })
}

fn parse_number(field: &'static str, raw: &str) -> Result<f64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(PredictorError::validation(field, "is required"));
    }
    raw.parse::<f64>()
        .map_err(|_| PredictorError::validation(field, format!("'{}' is not a number", raw)))
}

/// Lines of the "prediction details" view
pub fn details(request: &PredictionRequest, at: &NaiveDateTime, result: &PredictionResult) -> Vec<(&'static str, String)> {
    let mut lines = vec![
        ("Date/Time", at.format(DATE_TIME_FORMAT).to_string()),
        ("Inverter", request.inverter_id.clone()),
        ("Ambient temperature", format!("{:.1} °C", request.ambient_temperature)),
        ("Module temperature", format!("{:.1} °C", request.module_temperature)),
        ("Irradiation", format!("{:.2} kW/m²", request.irradiation)),
        ("Predicted AC power", result.formatted()),
    ];
    if let Some(spread) = result.spread_kw {
        lines.push(("Ensemble spread", format!("± {:.2} kW", spread)));
    }
    lines
}

/// One-line model summary for the "model loaded" banner
pub fn model_summary(metadata: &ModelMetadata) -> String {
    format!(
        "{} trained {} on {} rows (held-out MAE {:.2} kW, R² {:.4})",
        metadata.model_id,
        metadata.trained_at.format("%Y-%m-%d %H:%M UTC"),
        metadata.training_samples,
        metadata.validation_metrics.mae,
        metadata.validation_metrics.r2
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2020, 6, 28)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    fn form() -> FormInput {
        FormInput {
            inverter_id: "1BY6WEcLGh8j5v7".to_string(),
            ambient_temperature: "30".to_string(),
            module_temperature: " 45.0 ".to_string(),
            irradiation: "0.85".to_string(),
            date_time: String::new(),
        }
    }

    #[test]
    fn test_defaults_to_now() {
        let request = form().to_request(now()).unwrap();
        assert_eq!(request.module_temperature, 45.0);
        assert_eq!(request.hour, 12);
        assert_eq!(request.day_of_year, 180);
        // 2020-06-28 was a Sunday
        assert_eq!(request.weekday, 6);
    }

    #[test]
    fn test_explicit_date_time() {
        let input = FormInput {
            date_time: "2020-05-15 09:30".to_string(),
            ..form()
        };
        let request = input.to_request(now()).unwrap();
        assert_eq!((request.hour, request.day_of_year, request.weekday), (9, 136, 4));
    }

    #[test]
    fn test_errors_name_the_field() {
        let cases = [
            (FormInput { irradiation: "lots".to_string(), ..form() }, "irradiation"),
            (FormInput { ambient_temperature: "".to_string(), ..form() }, "ambient_temperature"),
            (FormInput { inverter_id: " ".to_string(), ..form() }, "inverter_id"),
            (FormInput { date_time: "28/06/2020".to_string(), ..form() }, "date_time"),
        ];
        for (input, field) in cases {
            let err = input.to_request(now()).unwrap_err();
            assert_eq!(err.field(), Some(field), "{:?}", err);
        }
    }

    #[test]
    fn test_details_lines() {
        let request = form().to_request(now()).unwrap();
        let result = PredictionResult { power_kw: 801.234, spread_kw: Some(12.5) };
        let lines = details(&request, &now(), &result);

        assert_eq!(lines[0], ("Date/Time", "2020-06-28 12:00".to_string()));
        assert_eq!(lines[5], ("Predicted AC power", "801.23 kW".to_string()));
        assert_eq!(lines.len(), 7);
    }
}
