//! Historical dataset ingest
//!
//! Reads training CSVs into [`Observation`]s. A dataset is either one merged
//! file that already carries weather and generation columns, or a plant
//! pair of generation + weather sensor files (see [`plant`]).
//!
//! Structural problems (missing column, unparseable value) abort the run with
//! [`PredictorError::DataIngest`]. Rows with empty fields are dropped and
//! counted in the [`RowReport`].

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use tracing::{info, warn};

use crate::domain::{Observation, RowReport};
use crate::error::{PredictorError, Result};

pub mod plant;

pub use plant::{load_plant, read_plant};

/// Accepted `DATE_TIME` layouts, tried in order
pub const TIMESTAMP_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M", "%d-%m-%Y %H:%M"];

pub const MERGED_COLUMNS: [&str; 6] = [
    "DATE_TIME",
    "AMBIENT_TEMPERATURE",
    "MODULE_TEMPERATURE",
    "IRRADIATION",
    "SOURCE_KEY",
    "AC_POWER",
];

/// Where training observations come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatasetSource {
    /// One file with all columns
    Merged(PathBuf),
    /// Generation and weather sensor files of one plant
    Plant { generation: PathBuf, weather: PathBuf },
}

impl std::fmt::Display for DatasetSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Merged(path) => write!(f, "{}", path.display()),
            Self::Plant { generation, weather } => {
                write!(f, "{} + {}", generation.display(), weather.display())
            }
        }
    }
}

pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
}

/// Header lookup plus typed field access for one CSV file
pub(crate) struct Table<'a> {
    path: &'a Path,
    columns: Vec<(&'static str, usize)>,
}

impl<'a> Table<'a> {
    pub(crate) fn new(
        path: &'a Path,
        headers: &csv::StringRecord,
        required: &[&'static str],
    ) -> Result<Self> {
        let columns = required
            .iter()
            .map(|&name| {
                headers
                    .iter()
                    .position(|h| h.trim() == name)
                    .map(|idx| (name, idx))
                    .ok_or_else(|| PredictorError::DataIngest {
                        path: path.to_path_buf(),
                        line: 1,
                        column: name.to_string(),
                        reason: "required column missing from header".to_string(),
                    })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { path, columns })
    }

    fn error(&self, record: &csv::StringRecord, column: &str, reason: String) -> PredictorError {
        PredictorError::DataIngest {
            path: self.path.to_path_buf(),
            line: line_of(record),
            column: column.to_string(),
            reason,
        }
    }

    /// Trimmed field, `None` when empty
    pub(crate) fn text<'r>(&self, record: &'r csv::StringRecord, column: &str) -> Option<&'r str> {
        let idx = self
            .columns
            .iter()
            .find(|(name, _)| *name == column)
            .map(|(_, idx)| *idx)?;
        record.get(idx).map(str::trim).filter(|v| !v.is_empty())
    }

    pub(crate) fn number(&self, record: &csv::StringRecord, column: &str) -> Result<Option<f64>> {
        match self.text(record, column) {
            None => Ok(None),
            Some(raw) => raw
                .parse::<f64>()
                .map(Some)
                .map_err(|_| self.error(record, column, format!("'{}' is not a number", raw))),
        }
    }

    pub(crate) fn timestamp(
        &self,
        record: &csv::StringRecord,
        column: &str,
    ) -> Result<Option<NaiveDateTime>> {
        match self.text(record, column) {
            None => Ok(None),
            Some(raw) => parse_timestamp(raw).map(Some).ok_or_else(|| {
                self.error(
                    record,
                    column,
                    format!("'{}' is not a date-time in a supported layout", raw),
                )
            }),
        }
    }

    pub(crate) fn unreadable(&self, err: csv::Error) -> PredictorError {
        PredictorError::DataIngest {
            path: self.path.to_path_buf(),
            line: err.position().map(|p| p.line()).unwrap_or(0),
            column: "-".to_string(),
            reason: err.to_string(),
        }
    }
}

pub(crate) fn line_of(record: &csv::StringRecord) -> u64 {
    record.position().map(|p| p.line()).unwrap_or(0)
}

pub(crate) fn headers_of<R: Read>(reader: &mut csv::Reader<R>, path: &Path) -> Result<csv::StringRecord> {
    reader
        .headers()
        .cloned()
        .map_err(|e| PredictorError::DataIngest {
            path: path.to_path_buf(),
            line: 1,
            column: "-".to_string(),
            reason: format!("cannot read header: {}", e),
        })
}

/// Parse a merged dataset. `path` is only used in error messages.
pub fn read_merged<R: Read>(reader: R, path: &Path, report: &mut RowReport) -> Result<Vec<Observation>> {
    let mut reader = csv::Reader::from_reader(reader);
    let headers = headers_of(&mut reader, path)?;
    let table = Table::new(path, &headers, &MERGED_COLUMNS)?;

    let mut observations = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| table.unreadable(e))?;

        let timestamp = table.timestamp(&record, "DATE_TIME")?;
        let ambient = table.number(&record, "AMBIENT_TEMPERATURE")?;
        let module = table.number(&record, "MODULE_TEMPERATURE")?;
        let irradiation = table.number(&record, "IRRADIATION")?;
        let source_key = table.text(&record, "SOURCE_KEY");
        let ac_power = table.number(&record, "AC_POWER")?;

        match (timestamp, ambient, module, irradiation, source_key, ac_power) {
            (Some(timestamp), Some(ambient), Some(module), Some(irradiation), Some(key), Some(ac_power)) => {
                observations.push(Observation {
                    timestamp,
                    source_key: key.to_string(),
                    ambient_temperature: ambient,
                    module_temperature: module,
                    irradiation,
                    ac_power,
                });
            }
            _ => {
                report.missing_value += 1;
                warn!(path = %path.display(), line = line_of(&record), "dropping row with empty field");
            }
        }
    }

    Ok(observations)
}

pub fn load_merged(path: &Path, report: &mut RowReport) -> Result<Vec<Observation>> {
    let file = File::open(path)?;
    read_merged(BufReader::new(file), path, report)
}

/// Read every source in order and concatenate the observations
pub fn load_all(sources: &[DatasetSource]) -> Result<(Vec<Observation>, RowReport)> {
    let mut observations = Vec::new();
    let mut report = RowReport::default();

    for source in sources {
        let mut source_report = RowReport::default();
        let rows = match source {
            DatasetSource::Merged(path) => load_merged(path, &mut source_report)?,
            DatasetSource::Plant { generation, weather } => {
                load_plant(generation, weather, &mut source_report)?
            }
        };
        info!(
            source = %source,
            rows = rows.len(),
            dropped = source_report.dropped(),
            "dataset read"
        );
        observations.extend(rows);
        report.merge(&source_report);
    }

    Ok((observations, report))
}
