//! Feature engineering for the power model
//!
//! Turns observations into the flat numeric table the forest is trained on.
//! [`feature_row`] is the single definition of the column order and is used
//! at both training and serving time.

use tracing::{debug, warn};

use super::CategoryEncoder;
use crate::domain::{EncodedObservation, Observation, RowReport, TimeFeatures};
use crate::error::{PredictorError, Result};

/// Column order of every feature row
pub const FEATURE_NAMES: [&str; 7] = [
    "AMBIENT_TEMPERATURE",
    "MODULE_TEMPERATURE",
    "IRRADIATION",
    "HOUR",
    "DAY_OF_YEAR",
    "WEEKDAY",
    "SOURCE_KEY_ENCODED",
];

pub fn feature_row(
    ambient_temperature: f64,
    module_temperature: f64,
    irradiation: f64,
    time: TimeFeatures,
    source_key_encoded: u32,
) -> Vec<f64> {
    vec![
        ambient_temperature,
        module_temperature,
        irradiation,
        time.hour as f64,
        time.day_of_year as f64,
        time.weekday as f64,
        source_key_encoded as f64,
    ]
}

pub fn feature_names() -> Vec<String> {
    FEATURE_NAMES.iter().map(|n| n.to_string()).collect()
}

/// Encoded training table plus the encoder fitted on it
#[derive(Debug, Clone)]
pub struct EncodedDataset {
    pub rows: Vec<EncodedObservation>,
    pub encoder: CategoryEncoder,
}

impl EncodedDataset {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn features(&self) -> Vec<Vec<f64>> {
        self.rows
            .iter()
            .map(|row| {
                let o = &row.observation;
                feature_row(
                    o.ambient_temperature,
                    o.module_temperature,
                    o.irradiation,
                    row.time,
                    row.source_key_encoded,
                )
            })
            .collect()
    }

    pub fn targets(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.observation.ac_power).collect()
    }

    pub fn max_power_kw(&self) -> f64 {
        self.rows
            .iter()
            .map(|r| r.observation.ac_power)
            .fold(0.0, f64::max)
    }
}

/// Builds the encoded table from observations
pub struct FeatureBuilder;

impl FeatureBuilder {
    /// Drops rows that break the physical invariants (counted in `report`),
    /// fits the inverter encoder on the rows that remain and derives the time
    /// features.
    pub fn build(observations: Vec<Observation>, report: &mut RowReport) -> Result<EncodedDataset> {
        let total = observations.len();
        let kept: Vec<Observation> = observations
            .into_iter()
            .filter(|o| Self::admit(o, report))
            .collect();

        if kept.is_empty() {
            return Err(PredictorError::Training(format!(
                "no usable rows: all {} observations were dropped",
                total
            )));
        }

        let encoder = CategoryEncoder::fit(kept.iter().map(|o| o.source_key.as_str()));

        let rows = kept
            .into_iter()
            .map(|observation| {
                let source_key_encoded = encoder.encode(&observation.source_key)?;
                Ok(EncodedObservation {
                    time: TimeFeatures::from_timestamp(&observation.timestamp),
                    source_key_encoded,
                    observation,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        report.kept += rows.len();
        debug!(
            rows = rows.len(),
            inverters = encoder.len(),
            "feature table built"
        );

        Ok(EncodedDataset { rows, encoder })
    }

    fn admit(o: &Observation, report: &mut RowReport) -> bool {
        let readings = [
            o.ambient_temperature,
            o.module_temperature,
            o.irradiation,
            o.ac_power,
        ];
        if readings.iter().any(|v| !v.is_finite()) {
            report.non_finite += 1;
            warn!(source_key = %o.source_key, timestamp = %o.timestamp, "dropping row with non-finite reading");
            return false;
        }
        if o.irradiation < 0.0 {
            report.negative_irradiation += 1;
            warn!(source_key = %o.source_key, timestamp = %o.timestamp, irradiation = o.irradiation, "dropping row with negative irradiation");
            return false;
        }
        if o.ac_power < 0.0 {
            report.negative_power += 1;
            warn!(source_key = %o.source_key, timestamp = %o.timestamp, ac_power = o.ac_power, "dropping row with negative AC power");
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn obs(key: &str, hour: u32, irradiation: f64, ac_power: f64) -> Observation {
        Observation {
            timestamp: NaiveDate::from_ymd_opt(2020, 5, 15)
                .unwrap()
                .and_hms_opt(hour, 15, 0)
                .unwrap(),
            source_key: key.to_string(),
            ambient_temperature: 25.0,
            module_temperature: 35.0,
            irradiation,
            ac_power,
        }
    }

    #[test]
    fn test_build_encodes_and_derives_time() {
        let mut report = RowReport::default();
        let dataset = FeatureBuilder::build(
            vec![obs("bbb", 12, 0.8, 900.0), obs("aaa", 0, 0.0, 0.0)],
            &mut report,
        )
        .unwrap();

        assert_eq!(dataset.len(), 2);
        assert_eq!(report.kept, 2);
        assert_eq!(dataset.rows[0].source_key_encoded, 1);
        assert_eq!(dataset.rows[1].source_key_encoded, 0);
        assert_eq!(dataset.rows[0].time.hour, 12);
        // 2020-05-15 was a Friday
        assert_eq!(dataset.rows[0].time.weekday, 4);

        let features = dataset.features();
        assert_eq!(features[0], vec![25.0, 35.0, 0.8, 12.0, 136.0, 4.0, 1.0]);
        assert_eq!(dataset.targets(), vec![900.0, 0.0]);
        assert_eq!(dataset.max_power_kw(), 900.0);
    }

    #[test]
    fn test_build_drops_invalid_rows() {
        let mut report = RowReport::default();
        let dataset = FeatureBuilder::build(
            vec![
                obs("aaa", 12, 0.8, 900.0),
                obs("bbb", 12, -0.1, 0.0),
                obs("ccc", 12, 0.5, -3.0),
                obs("ddd", 12, f64::NAN, 10.0),
            ],
            &mut report,
        )
        .unwrap();

        assert_eq!(dataset.len(), 1);
        assert_eq!(report.negative_irradiation, 1);
        assert_eq!(report.negative_power, 1);
        assert_eq!(report.non_finite, 1);
        // dropped inverters are not part of the encoder
        assert_eq!(dataset.encoder.categories(), &["aaa"]);
    }

    #[test]
    fn test_build_rejects_when_nothing_is_left() {
        let mut report = RowReport::default();
        let err = FeatureBuilder::build(vec![obs("aaa", 12, -1.0, 0.0)], &mut report).unwrap_err();
        assert!(matches!(err, PredictorError::Training(_)));
    }

    #[test]
    fn test_feature_row_matches_names() {
        let time = TimeFeatures {
            hour: 12,
            day_of_year: 180,
            weekday: 2,
        };
        let row = feature_row(30.0, 45.0, 0.85, time, 0);
        assert_eq!(row.len(), FEATURE_NAMES.len());
        assert_eq!(row, vec![30.0, 45.0, 0.85, 12.0, 180.0, 2.0, 0.0]);
    }
}
