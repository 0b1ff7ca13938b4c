//! Two-file plant layout
//!
//! Generation rows are joined to weather sensor readings on
//! (`DATE_TIME`, `PLANT_ID`). The weather file's `SOURCE_KEY` names the
//! sensor, not an inverter, and is ignored. A generation row without a
//! matching reading is dropped.

use std::collections::hash_map::{Entry, HashMap};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use chrono::NaiveDateTime;
use tracing::{debug, warn};

use super::{headers_of, line_of, Table};
use crate::domain::{Observation, RowReport};
use crate::error::Result;

pub const GENERATION_COLUMNS: [&str; 4] = ["DATE_TIME", "PLANT_ID", "SOURCE_KEY", "AC_POWER"];

pub const WEATHER_COLUMNS: [&str; 5] = [
    "DATE_TIME",
    "PLANT_ID",
    "AMBIENT_TEMPERATURE",
    "MODULE_TEMPERATURE",
    "IRRADIATION",
];

#[derive(Debug, Clone, Copy)]
struct WeatherReading {
    ambient_temperature: f64,
    module_temperature: f64,
    irradiation: f64,
}

type WeatherIndex = HashMap<(NaiveDateTime, String), WeatherReading>;

fn read_weather<R: Read>(reader: R, path: &Path, report: &mut RowReport) -> Result<WeatherIndex> {
    let mut reader = csv::Reader::from_reader(reader);
    let headers = headers_of(&mut reader, path)?;
    let table = Table::new(path, &headers, &WEATHER_COLUMNS)?;

    let mut index = WeatherIndex::new();
    let mut duplicates = 0usize;
    for result in reader.records() {
        let record = result.map_err(|e| table.unreadable(e))?;

        let timestamp = table.timestamp(&record, "DATE_TIME")?;
        let plant = table.text(&record, "PLANT_ID");
        let ambient = table.number(&record, "AMBIENT_TEMPERATURE")?;
        let module = table.number(&record, "MODULE_TEMPERATURE")?;
        let irradiation = table.number(&record, "IRRADIATION")?;

        let (Some(timestamp), Some(plant), Some(ambient), Some(module), Some(irradiation)) =
            (timestamp, plant, ambient, module, irradiation)
        else {
            report.missing_value += 1;
            warn!(path = %path.display(), line = line_of(&record), "dropping weather reading with empty field");
            continue;
        };

        // first reading for a timestamp wins
        let reading = WeatherReading {
            ambient_temperature: ambient,
            module_temperature: module,
            irradiation,
        };
        match index.entry((timestamp, plant.to_string())) {
            Entry::Occupied(_) => duplicates += 1,
            Entry::Vacant(slot) => {
                slot.insert(reading);
            }
        }
    }

    if duplicates > 0 {
        warn!(path = %path.display(), duplicates, "ignored duplicate weather readings");
    }
    debug!(path = %path.display(), readings = index.len(), "weather index built");
    Ok(index)
}

/// Join a generation file to its weather file. The paths are only used in
/// error messages.
pub fn read_plant<G: Read, W: Read>(
    generation: G,
    generation_path: &Path,
    weather: W,
    weather_path: &Path,
    report: &mut RowReport,
) -> Result<Vec<Observation>> {
    let index = read_weather(weather, weather_path, report)?;

    let mut reader = csv::Reader::from_reader(generation);
    let headers = headers_of(&mut reader, generation_path)?;
    let table = Table::new(generation_path, &headers, &GENERATION_COLUMNS)?;

    let mut observations = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| table.unreadable(e))?;

        let timestamp = table.timestamp(&record, "DATE_TIME")?;
        let plant = table.text(&record, "PLANT_ID");
        let source_key = table.text(&record, "SOURCE_KEY");
        let ac_power = table.number(&record, "AC_POWER")?;

        let (Some(timestamp), Some(plant), Some(source_key), Some(ac_power)) =
            (timestamp, plant, source_key, ac_power)
        else {
            report.missing_value += 1;
            warn!(path = %generation_path.display(), line = line_of(&record), "dropping generation row with empty field");
            continue;
        };

        let Some(weather) = index.get(&(timestamp, plant.to_string())) else {
            report.unmatched_weather += 1;
            warn!(
                path = %generation_path.display(),
                line = line_of(&record),
                %timestamp,
                plant,
                "dropping generation row with no weather reading"
            );
            continue;
        };

        observations.push(Observation {
            timestamp,
            source_key: source_key.to_string(),
            ambient_temperature: weather.ambient_temperature,
            module_temperature: weather.module_temperature,
            irradiation: weather.irradiation,
            ac_power,
        });
    }

    Ok(observations)
}

pub fn load_plant(generation: &Path, weather: &Path, report: &mut RowReport) -> Result<Vec<Observation>> {
    let generation_file = BufReader::new(File::open(generation)?);
    let weather_file = BufReader::new(File::open(weather)?);
    read_plant(generation_file, generation, weather_file, weather, report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PredictorError;

    // Plant 1 writes day-first dates in its generation file
    const GENERATION: &str = "\
DATE_TIME,PLANT_ID,SOURCE_KEY,DC_POWER,AC_POWER,DAILY_YIELD,TOTAL_YIELD
15-05-2020 12:00,4135001,1BY6WEcLGh8j5v7,8300.5,812.4,3000.0,6259559.0
15-05-2020 12:00,4135001,zBIq5rxdHJRwDNY,8100.2,795.1,2900.0,6183645.0
15-05-2020 12:15,4135001,1BY6WEcLGh8j5v7,8400.0,820.0,3200.0,6259760.0
15-05-2020 12:00,4136001,4UPUqMRk7TRMgml,7000.0,690.3,2500.0,2429011.0
";

    const WEATHER: &str = "\
DATE_TIME,PLANT_ID,SOURCE_KEY,AMBIENT_TEMPERATURE,MODULE_TEMPERATURE,IRRADIATION
2020-05-15 12:00:00,4135001,HmiyD2TTLFNqkNe,30.1,48.2,0.81
2020-05-15 12:00:00,4135001,HmiyD2TTLFNqkNe,99.0,99.0,1.4
2020-05-15 12:00:00,4136001,iq8k7ZNt4Mwm3w0,28.0,44.0,0.72
";

    fn join(generation: &str, weather: &str) -> Result<(Vec<Observation>, RowReport)> {
        let mut report = RowReport::default();
        let rows = read_plant(
            generation.as_bytes(),
            Path::new("gen.csv"),
            weather.as_bytes(),
            Path::new("weather.csv"),
            &mut report,
        )?;
        Ok((rows, report))
    }

    #[test]
    fn test_join_on_time_and_plant() {
        let (rows, report) = join(GENERATION, WEATHER).unwrap();

        assert_eq!(rows.len(), 3);
        assert_eq!(report.unmatched_weather, 1);

        // inverter key comes from the generation file
        assert_eq!(rows[0].source_key, "1BY6WEcLGh8j5v7");
        assert_eq!(rows[0].ambient_temperature, 30.1);
        assert_eq!(rows[1].irradiation, 0.81);

        // plant 2 gets its own sensor's reading
        assert_eq!(rows[2].source_key, "4UPUqMRk7TRMgml");
        assert_eq!(rows[2].module_temperature, 44.0);
    }

    #[test]
    fn test_empty_weather_field_drops_reading() {
        let weather = "\
DATE_TIME,PLANT_ID,SOURCE_KEY,AMBIENT_TEMPERATURE,MODULE_TEMPERATURE,IRRADIATION
2020-05-15 12:00:00,4135001,HmiyD2TTLFNqkNe,30.1,,0.81
";
        let (rows, report) = join(GENERATION, weather).unwrap();
        assert!(rows.is_empty());
        assert_eq!(report.missing_value, 1);
        assert_eq!(report.unmatched_weather, 4);
    }

    #[test]
    fn test_generation_without_plant_column() {
        let generation = "DATE_TIME,SOURCE_KEY,AC_POWER\n15-05-2020 12:00,a,1.0\n";
        let err = join(generation, WEATHER).unwrap_err();
        assert!(matches!(
            err,
            PredictorError::DataIngest { ref column, ref path, .. }
                if column == "PLANT_ID" && path == Path::new("gen.csv")
        ));
    }

    #[test]
    fn test_load_plant_from_files() {
        let dir = tempfile::tempdir().unwrap();
        let generation = dir.path().join("Plant_1_Generation_Data.csv");
        let weather = dir.path().join("Plant_1_Weather_Sensor_Data.csv");
        std::fs::write(&generation, GENERATION).unwrap();
        std::fs::write(&weather, WEATHER).unwrap();

        let rows = load_plant(&generation, &weather, &mut RowReport::default()).unwrap();
        assert_eq!(rows.len(), 3);
    }
}
