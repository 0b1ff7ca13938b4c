//! Train command - CSV dataset to persisted model artifact.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use tracing::info;

use crate::config::Config;
use crate::domain::RowReport;
use crate::ingest::{self, DatasetSource};
use crate::ml::{FeatureBuilder, ModelStore, ModelTrainer, TrainingConfig, ValidationMetrics};

/// Flags of `train` that override the configuration
#[derive(Debug, Clone, Default)]
pub struct TrainArgs {
    pub datasets: Vec<PathBuf>,
    pub generation: Vec<PathBuf>,
    pub weather: Vec<PathBuf>,
    pub output: Option<PathBuf>,
    pub seed: Option<u64>,
    pub no_seed: bool,
    pub trees: Option<usize>,
}

/// What a training run produced
#[derive(Debug, Clone)]
pub struct TrainReport {
    pub model_id: String,
    pub output: PathBuf,
    pub rows: RowReport,
    pub training_samples: usize,
    pub test_samples: usize,
    pub inverters: usize,
    pub metrics: ValidationMetrics,
    pub seed: u64,
}

impl TrainArgs {
    fn sources(&self, cfg: &Config) -> Result<Vec<DatasetSource>> {
        if self.generation.len() != self.weather.len() {
            bail!(
                "--generation and --weather must be given in pairs ({} vs {})",
                self.generation.len(),
                self.weather.len()
            );
        }

        let mut sources: Vec<DatasetSource> = self
            .datasets
            .iter()
            .cloned()
            .map(DatasetSource::Merged)
            .collect();
        sources.extend(
            self.generation
                .iter()
                .zip(self.weather.iter())
                .map(|(generation, weather)| DatasetSource::Plant {
                    generation: generation.clone(),
                    weather: weather.clone(),
                }),
        );

        if sources.is_empty() {
            sources = cfg.training.sources();
        }
        if sources.is_empty() {
            bail!("no training data: pass --dataset or --generation/--weather, or set [training] in the config");
        }
        Ok(sources)
    }

    fn trainer_config(&self, cfg: &Config) -> TrainingConfig {
        let mut config = cfg.training.trainer_config();
        if self.no_seed {
            config.seed = None;
        } else if let Some(seed) = self.seed {
            config.seed = Some(seed);
        }
        if let Some(trees) = self.trees {
            config.forest.n_trees = trees;
        }
        config
    }
}

/// Runs the train command.
pub fn run(cfg: &Config, args: &TrainArgs) -> Result<()> {
    let sources = args.sources(cfg)?;
    let output = args
        .output
        .clone()
        .unwrap_or_else(|| cfg.model.artifact_path.clone());

    let report = train(&sources, &args.trainer_config(cfg), &output)?;

    println!("\nModel Evaluation:");
    println!("Mean Absolute Error (MAE): {:.2} kW", report.metrics.mae);
    println!("R-squared (R2) Score: {:.4}", report.metrics.r2);
    println!(
        "Model saved to {} ({} inverters, {} training rows, {} held out, {} rows dropped)",
        report.output.display(),
        report.inverters,
        report.training_samples,
        report.test_samples,
        report.rows.dropped()
    );
    Ok(())
}

/// Read `sources`, train, and save the artifact to `output`
pub fn train(sources: &[DatasetSource], config: &TrainingConfig, output: &Path) -> Result<TrainReport> {
    let (observations, mut rows) = ingest::load_all(sources)
        .with_context(|| format!("failed to read training data from {} source(s)", sources.len()))?;

    let dataset = FeatureBuilder::build(observations, &mut rows)?;
    info!(
        kept = rows.kept,
        missing_value = rows.missing_value,
        non_finite = rows.non_finite,
        negative_irradiation = rows.negative_irradiation,
        negative_power = rows.negative_power,
        unmatched_weather = rows.unmatched_weather,
        "row report"
    );

    let model = ModelTrainer::new(config.clone()).train(&dataset)?;
    ModelStore::save(&model, &dataset.encoder, output)
        .with_context(|| format!("failed to write model to {}", output.display()))?;

    Ok(TrainReport {
        model_id: model.metadata.model_id.clone(),
        output: output.to_path_buf(),
        rows,
        training_samples: model.metadata.training_samples,
        test_samples: model.metadata.test_samples,
        inverters: dataset.encoder.len(),
        metrics: model.metadata.validation_metrics,
        seed: model.metadata.seed,
    })
}
