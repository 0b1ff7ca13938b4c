use anyhow::Result;
use figment::{providers::{Env, Format, Serialized, Toml}, Figment};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;

use crate::domain::InputLimits;
use crate::ingest::DatasetSource;
use crate::ml::{ForestParams, TrainingConfig};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub model: ModelConfig,
    pub training: TrainingSection,
    pub limits: InputLimits,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig { pub host: String, pub port: u16, pub request_timeout_secs: u64 }
impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        Ok(format!("{}:{}", self.host, self.port).parse()?)
    }
}
impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: "127.0.0.1".to_string(), port: 8080, request_timeout_secs: 10 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig { pub artifact_path: PathBuf }
impl Default for ModelConfig {
    fn default() -> Self {
        Self { artifact_path: PathBuf::from("model/solar_power_model.bin") }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlantFiles { pub generation: PathBuf, pub weather: PathBuf }

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingSection {
    /// Merged CSV files
    pub datasets: Vec<PathBuf>,
    /// Generation + weather file pairs
    pub plants: Vec<PlantFiles>,
    pub test_fraction: f64,
    pub seed: Option<u64>,
    pub forest: ForestParams,
}

impl Default for TrainingSection {
    fn default() -> Self {
        let defaults = TrainingConfig::default();
        Self {
            datasets: Vec::new(),
            plants: (1..=2)
                .map(|n| PlantFiles {
                    generation: PathBuf::from(format!("dataset/Plant_{}_Generation_Data.csv", n)),
                    weather: PathBuf::from(format!("dataset/Plant_{}_Weather_Sensor_Data.csv", n)),
                })
                .collect(),
            test_fraction: defaults.test_fraction,
            seed: defaults.seed,
            forest: defaults.forest,
        }
    }
}

impl TrainingSection {
    pub fn sources(&self) -> Vec<DatasetSource> {
        self.datasets
            .iter()
            .cloned()
            .map(DatasetSource::Merged)
            .chain(self.plants.iter().map(|p| DatasetSource::Plant {
                generation: p.generation.clone(),
                weather: p.weather.clone(),
            }))
            .collect()
    }

    pub fn trainer_config(&self) -> TrainingConfig {
        TrainingConfig { forest: self.forest, test_fraction: self.test_fraction, seed: self.seed }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig { pub directory: PathBuf }
impl Default for LoggingConfig {
    fn default() -> Self {
        Self { directory: PathBuf::from("logs") }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::figment().extract().map_err(Into::into)
    }

    /// Compiled defaults, then `config/default.toml`, then `SOLAR__*` variables
    pub fn figment() -> Figment {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file("config/default.toml"))
            .merge(Env::prefixed("SOLAR__").split("__"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.model.artifact_path, PathBuf::from("model/solar_power_model.bin"));
        assert_eq!(config.training.seed, Some(42));
        assert_eq!(config.training.forest.n_trees, 100);
        assert_eq!(config.limits.irradiation_max, 1.5);
        assert_eq!(config.training.sources().len(), 2);
    }

    #[test]
    fn test_file_and_env_layers() {
        figment::Jail::expect_with(|jail| {
            jail.create_dir("config")?;
            jail.create_file(
                "config/default.toml",
                r#"
                [server]
                port = 9000

                [training]
                datasets = ["data/merged.csv"]
                plants = []

                [training.forest]
                n_trees = 40

                [limits]
                irradiation_max = 1.2
                "#,
            )?;
            jail.set_env("SOLAR__SERVER__HOST", "0.0.0.0");
            jail.set_env("SOLAR__MODEL__ARTIFACT_PATH", "/tmp/m.bin");

            let config: Config = Config::figment().extract()?;
            assert_eq!(config.server.port, 9000);
            assert_eq!(config.server.host, "0.0.0.0");
            assert_eq!(config.model.artifact_path, PathBuf::from("/tmp/m.bin"));
            assert_eq!(config.training.forest.n_trees, 40);
            // untouched keys keep their compiled default
            assert_eq!(config.training.forest.max_depth, Some(15));
            assert_eq!(config.limits.irradiation_max, 1.2);
            assert_eq!(config.limits.ambient_max_c, 80.0);
            assert_eq!(
                config.training.sources(),
                vec![DatasetSource::Merged(PathBuf::from("data/merged.csv"))]
            );
            Ok(())
        });
    }
}
