//! Server-rendered HTML form

use axum::{extract::State, response::Html, Form};
use tracing::debug;

use super::AppState;
use crate::error::PredictorError;
use crate::frontend::{details, model_summary, FormInput, DATE_TIME_FORMAT};

enum Outcome {
    Prediction(Vec<(&'static str, String)>),
    Error(PredictorError),
}

/// GET /
pub async fn index(State(state): State<AppState>) -> Html<String> {
    let input = FormInput {
        date_time: (state.clock)().format(DATE_TIME_FORMAT).to_string(),
        ..FormInput::default()
    };
    Html(render(&state, &input, None))
}

/// POST /predict
pub async fn submit(State(state): State<AppState>, Form(input): Form<FormInput>) -> Html<String> {
    let now = (state.clock)();
    let outcome = input.to_request(now).and_then(|request| {
        let at = input.timestamp(now)?;
        let result = state.predictor.predict(&request)?;
        Ok(details(&request, &at, &result))
    });

    let outcome = match outcome {
        Ok(lines) => Outcome::Prediction(lines),
        Err(e) => {
            debug!(error = %e, "form prediction rejected");
            Outcome::Error(e)
        }
    };
    Html(render(&state, &input, Some(outcome)))
}

fn render(state: &AppState, input: &FormInput, outcome: Option<Outcome>) -> String {
    let metadata = state.predictor.metadata();
    let limits = state.predictor.limits();
    let error_field = match &outcome {
        Some(Outcome::Error(e)) => e.field(),
        _ => None,
    };

    let options: String = state
        .predictor
        .inverter_ids()
        .iter()
        .map(|id| {
            let selected = if *id == input.inverter_id { " selected" } else { "" };
            format!(r#"<option value="{0}"{1}>{0}</option>"#, escape(id), selected)
        })
        .collect();

    let result = match outcome {
        None => String::new(),
        Some(Outcome::Prediction(lines)) => {
            let rows: String = lines
                .iter()
                .map(|(label, value)| format!("<tr><th>{}</th><td>{}</td></tr>", label, escape(value)))
                .collect();
            format!(r#"<section class="result"><h2>Prediction details</h2><table>{}</table></section>"#, rows)
        }
        Some(Outcome::Error(e)) => format!(
            r#"<section class="error"><strong>{}</strong>: {}</section>"#,
            e.kind(),
            escape(&e.to_string())
        ),
    };

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head><meta charset="utf-8"><title>Solar AC Power Predictor</title></head>
<body>
<h1>Solar AC Power Predictor</h1>
<p class="model">Model loaded: {summary}</p>
<form method="post" action="/predict">
<label>Inverter <select name="inverter_id"><option value="">Select an inverter</option>{options}</select></label>{e_inverter}
{ambient}
{module}
{irradiation}
<label>Date/Time (YYYY-MM-DD HH:MM) <input name="date_time" value="{date_time}"></label>{e_date}
<button type="submit">Predict AC Power</button>
</form>
{result}
</body>
</html>
"#,
        summary = escape(&model_summary(&metadata)),
        options = options,
        e_inverter = field_marker("inverter_id", error_field),
        ambient = number_input("ambient_temperature", "Ambient temperature (°C)", &input.ambient_temperature, limits.ambient_min_c, limits.ambient_max_c, error_field),
        module = number_input("module_temperature", "Module temperature (°C)", &input.module_temperature, limits.module_min_c, limits.module_max_c, error_field),
        irradiation = number_input("irradiation", "Irradiation (kW/m²)", &input.irradiation, limits.irradiation_min, limits.irradiation_max, error_field),
        date_time = escape(&input.date_time),
        e_date = field_marker("date_time", error_field),
        result = result,
    )
}

fn number_input(
    name: &str,
    label: &str,
    value: &str,
    min: f64,
    max: f64,
    error_field: Option<&str>,
) -> String {
    format!(
        r#"<label>{label} <input name="{name}" value="{value}" inputmode="decimal" placeholder="{min} to {max}"></label>{marker}"#,
        label = label,
        name = name,
        value = escape(value),
        min = min,
        max = max,
        marker = field_marker(name, error_field),
    )
}

fn field_marker(name: &str, error_field: Option<&str>) -> &'static str {
    if error_field == Some(name) {
        r#" <span class="invalid">&#9888;</span>"#
    } else {
        ""
    }
}

fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}
