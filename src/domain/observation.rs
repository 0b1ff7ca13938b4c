use chrono::{Datelike, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

/// One historical inverter reading joined with the plant's weather reading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// Plant-local timestamp (the datasets carry no zone)
    pub timestamp: NaiveDateTime,
    /// Inverter identifier
    pub source_key: String,
    /// Ambient temperature (°C)
    pub ambient_temperature: f64,
    /// Module temperature (°C)
    pub module_temperature: f64,
    /// Irradiation (kW/m²)
    pub irradiation: f64,
    /// AC power output (kW), the regression label
    pub ac_power: f64,
}

/// Calendar features derived from a timestamp
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeFeatures {
    /// Hour of day (0-23)
    pub hour: u32,
    /// Day of year (1-366)
    pub day_of_year: u32,
    /// Day of week (0=Monday, 6=Sunday)
    pub weekday: u32,
}

impl TimeFeatures {
    pub fn from_timestamp(timestamp: &NaiveDateTime) -> Self {
        Self {
            hour: timestamp.hour(),
            day_of_year: timestamp.ordinal(),
            weekday: timestamp.weekday().num_days_from_monday(),
        }
    }
}

/// Observation with its derived time features and inverter code
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncodedObservation {
    pub observation: Observation,
    pub time: TimeFeatures,
    pub source_key_encoded: u32,
}

/// Row accounting for a training run: rows kept and rows dropped per reason
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowReport {
    pub kept: usize,
    /// A required field was empty
    pub missing_value: usize,
    /// NaN or infinite reading
    pub non_finite: usize,
    pub negative_irradiation: usize,
    pub negative_power: usize,
    /// Generation row without a weather reading at the same plant and time
    pub unmatched_weather: usize,
}

impl RowReport {
    pub fn dropped(&self) -> usize {
        self.missing_value
            + self.non_finite
            + self.negative_irradiation
            + self.negative_power
            + self.unmatched_weather
    }

    pub fn merge(&mut self, other: &RowReport) {
        self.kept += other.kept;
        self.missing_value += other.missing_value;
        self.non_finite += other.non_finite;
        self.negative_irradiation += other.negative_irradiation;
        self.negative_power += other.negative_power;
        self.unmatched_weather += other.unmatched_weather;
    }
}
