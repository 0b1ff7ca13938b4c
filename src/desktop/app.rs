//! Form state for the terminal front-end.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::NaiveDateTime;
use tracing::{debug, info};

use crate::frontend::{details, model_summary, FormInput, DATE_TIME_FORMAT};
use crate::ml::PowerPredictor;

const STATUS_TTL: Duration = Duration::from_secs(8);

/// Form fields, in focus order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Inverter,
    Ambient,
    Module,
    Irradiation,
    DateTime,
}

impl Field {
    pub const ALL: [Field; 5] = [
        Field::Inverter,
        Field::Ambient,
        Field::Module,
        Field::Irradiation,
        Field::DateTime,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Field::Inverter => "Inverter ID",
            Field::Ambient => "Ambient Temperature (°C)",
            Field::Module => "Module Temperature (°C)",
            Field::Irradiation => "Irradiation (kW/m²)",
            Field::DateTime => "Date/Time (YYYY-MM-DD HH:MM)",
        }
    }

    /// Name used in validation errors
    pub fn key(&self) -> &'static str {
        match self {
            Field::Inverter => "inverter_id",
            Field::Ambient => "ambient_temperature",
            Field::Module => "module_temperature",
            Field::Irradiation => "irradiation",
            Field::DateTime => "date_time",
        }
    }

    fn index(&self) -> usize {
        Field::ALL.iter().position(|f| f == self).unwrap_or(0)
    }
}

/// Main application state.
pub struct App {
    predictor: Arc<dyn PowerPredictor>,
    clock: fn() -> NaiveDateTime,
    pub inverters: Vec<String>,
    pub selected_inverter: Option<usize>,
    pub ambient: String,
    pub module: String,
    pub irradiation: String,
    pub date_time: String,
    pub focus: Field,
    /// Lines of the last successful prediction
    pub details: Vec<(&'static str, String)>,
    /// Field named by the last validation failure
    pub error_field: Option<&'static str>,
    pub status_message: Option<(String, Instant)>,
    pub model_line: String,
    pub should_quit: bool,
}

impl App {
    pub fn new(predictor: Arc<dyn PowerPredictor>, clock: fn() -> NaiveDateTime) -> Self {
        let inverters = predictor.inverter_ids();
        let model_line = model_summary(&predictor.metadata());
        Self {
            selected_inverter: if inverters.is_empty() { None } else { Some(0) },
            inverters,
            date_time: clock().format(DATE_TIME_FORMAT).to_string(),
            predictor,
            clock,
            ambient: String::new(),
            module: String::new(),
            irradiation: String::new(),
            focus: Field::Inverter,
            details: Vec::new(),
            error_field: None,
            status_message: None,
            model_line,
            should_quit: false,
        }
    }

    pub fn next_field(&mut self) {
        self.focus = Field::ALL[(self.focus.index() + 1) % Field::ALL.len()];
    }

    pub fn previous_field(&mut self) {
        let len = Field::ALL.len();
        self.focus = Field::ALL[(self.focus.index() + len - 1) % len];
    }

    pub fn next_inverter(&mut self) {
        if let Some(idx) = self.selected_inverter {
            self.selected_inverter = Some((idx + 1) % self.inverters.len());
        }
    }

    pub fn previous_inverter(&mut self) {
        if let Some(idx) = self.selected_inverter {
            let len = self.inverters.len();
            self.selected_inverter = Some((idx + len - 1) % len);
        }
    }

    pub fn selected_inverter_id(&self) -> &str {
        self.selected_inverter
            .and_then(|idx| self.inverters.get(idx))
            .map(String::as_str)
            .unwrap_or("")
    }

    fn focused_text(&mut self) -> Option<&mut String> {
        match self.focus {
            Field::Inverter => None,
            Field::Ambient => Some(&mut self.ambient),
            Field::Module => Some(&mut self.module),
            Field::Irradiation => Some(&mut self.irradiation),
            Field::DateTime => Some(&mut self.date_time),
        }
    }

    pub fn input_char(&mut self, c: char) {
        if let Some(text) = self.focused_text() {
            text.push(c);
        }
    }

    pub fn backspace(&mut self) {
        if let Some(text) = self.focused_text() {
            text.pop();
        }
    }

    pub fn value(&self, field: Field) -> &str {
        match field {
            Field::Inverter => self.selected_inverter_id(),
            Field::Ambient => &self.ambient,
            Field::Module => &self.module,
            Field::Irradiation => &self.irradiation,
            Field::DateTime => &self.date_time,
        }
    }

    pub fn form_input(&self) -> FormInput {
        FormInput {
            inverter_id: self.selected_inverter_id().to_string(),
            ambient_temperature: self.ambient.clone(),
            module_temperature: self.module.clone(),
            irradiation: self.irradiation.clone(),
            date_time: self.date_time.clone(),
        }
    }

    /// Validate the form and run a prediction
    pub fn submit(&mut self) {
        let input = self.form_input();
        let now = (self.clock)();

        let outcome = input.to_request(now).and_then(|request| {
            let at = input.timestamp(now)?;
            let result = self.predictor.predict(&request)?;
            Ok((details(&request, &at, &result), result))
        });

        match outcome {
            Ok((lines, result)) => {
                info!(inverter = %input.inverter_id, power_kw = result.power_kw, "prediction");
                self.details = lines;
                self.error_field = None;
                self.set_status(format!("Predicted AC Power: {}", result.formatted()));
            }
            Err(e) => {
                debug!(error = %e, "prediction rejected");
                self.details.clear();
                self.error_field = e.field();
                self.set_status(format!("{}: {}", e.kind(), e));
            }
        }
    }

    pub fn clear(&mut self) {
        self.ambient.clear();
        self.module.clear();
        self.irradiation.clear();
        self.date_time = (self.clock)().format(DATE_TIME_FORMAT).to_string();
        self.details.clear();
        self.error_field = None;
        self.status_message = None;
    }

    /// Set a status message that will be displayed temporarily.
    pub fn set_status(&mut self, message: impl Into<String>) {
        self.status_message = Some((message.into(), Instant::now()));
    }

    /// Clear expired status messages.
    pub fn clear_expired_status(&mut self) {
        if let Some((_, instant)) = &self.status_message {
            if instant.elapsed() > STATUS_TTL {
                self.status_message = None;
            }
        }
    }
}
