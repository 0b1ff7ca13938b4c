//! Solar Power Predictor
//!
//! Trains a random forest on inverter generation data and predicts AC power
//! from a terminal form, a web form, or the command line.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use solar_power_predictor::commands::{self, predict::PredictArgs, train::TrainArgs};
use solar_power_predictor::config::Config;
use solar_power_predictor::telemetry::init_tracing;

/// Solar inverter AC power predictor
#[derive(Parser)]
#[command(name = "solar-power-predictor")]
#[command(about = "Random forest AC power prediction for solar inverters")]
#[command(version)]
struct Cli {
    /// Model artifact to read or write (overrides `model.artifact_path`)
    #[arg(short, long, global = true)]
    model: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Train a model from CSV data and save it
    Train {
        /// Merged CSV file (repeatable)
        #[arg(short, long = "dataset")]
        datasets: Vec<PathBuf>,

        /// Plant generation CSV, paired in order with --weather (repeatable)
        #[arg(long)]
        generation: Vec<PathBuf>,

        /// Plant weather-sensor CSV, paired in order with --generation (repeatable)
        #[arg(long)]
        weather: Vec<PathBuf>,

        /// Where to write the artifact (defaults to the model path)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Forest seed
        #[arg(long, conflicts_with = "no_seed")]
        seed: Option<u64>,

        /// Train without a fixed seed (non-reproducible)
        #[arg(long)]
        no_seed: bool,

        /// Number of trees
        #[arg(long)]
        trees: Option<usize>,
    },

    /// Predict AC power for one set of conditions
    Predict {
        /// Inverter identifier as it appears in the training data
        #[arg(short, long)]
        inverter: String,

        /// Ambient temperature (°C)
        #[arg(short, long, allow_negative_numbers = true)]
        ambient: f64,

        /// Module temperature (°C)
        #[arg(short = 't', long, allow_negative_numbers = true)]
        module: f64,

        /// Irradiation (kW/m²)
        #[arg(short = 'r', long)]
        irradiation: f64,

        /// Date and time, `YYYY-MM-DD HH:MM` (defaults to now)
        #[arg(long)]
        at: Option<String>,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// List the inverters the model knows
    Inverters,

    /// Run the web front-end
    Serve {
        /// Bind address (overrides `server.host`)
        #[arg(long)]
        host: Option<String>,

        /// Port (overrides `server.port`)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Run the terminal form front-end
    #[cfg(feature = "desktop")]
    Desktop,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut cfg = Config::load()?;
    if let Some(model) = cli.model {
        cfg.model.artifact_path = model;
    }

    // the terminal form owns stdout, so it logs to files instead
    #[cfg(feature = "desktop")]
    let _guard = match cli.command {
        Commands::Desktop => Some(solar_power_predictor::telemetry::init_file_tracing(
            &cfg.logging.directory,
        )?),
        _ => {
            init_tracing();
            None
        }
    };
    #[cfg(not(feature = "desktop"))]
    init_tracing();

    match cli.command {
        Commands::Train {
            datasets,
            generation,
            weather,
            output,
            seed,
            no_seed,
            trees,
        } => {
            let args = TrainArgs {
                datasets,
                generation,
                weather,
                output,
                seed,
                no_seed,
                trees,
            };
            commands::train::run(&cfg, &args)?;
        }
        Commands::Predict {
            inverter,
            ambient,
            module,
            irradiation,
            at,
            json,
        } => {
            let args = PredictArgs {
                inverter,
                ambient,
                module,
                irradiation,
                at,
                json,
            };
            commands::predict::run(&cfg.model.artifact_path, cfg.limits, &args)?;
        }
        Commands::Inverters => {
            commands::predict::list_inverters(&cfg.model.artifact_path, cfg.limits)?;
        }
        Commands::Serve { host, port } => {
            if let Some(host) = host {
                cfg.server.host = host;
            }
            if let Some(port) = port {
                cfg.server.port = port;
            }
            commands::serve::run(&cfg).await?;
        }
        #[cfg(feature = "desktop")]
        Commands::Desktop => {
            tracing::info!(model = %cfg.model.artifact_path.display(), "starting terminal form");
            commands::desktop(&cfg)?;
        }
    }

    Ok(())
}
