//! Predict and inverters commands - one-shot use of a saved model.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::domain::{InputLimits, PredictionRequest};
use crate::frontend::{details, parse_date_time};
use crate::ml::{ModelContext, PowerPredictor, PredictionService};

#[derive(Debug, Clone)]
pub struct PredictArgs {
    pub inverter: String,
    pub ambient: f64,
    pub module: f64,
    pub irradiation: f64,
    /// `YYYY-MM-DD HH:MM`, defaults to now
    pub at: Option<String>,
    pub json: bool,
}

/// Load the artifact into a ready prediction service
pub fn load_service(artifact: &Path, limits: InputLimits) -> Result<PredictionService> {
    let context = ModelContext::load(artifact).with_context(|| {
        format!(
            "cannot load model from {} (run `solar-power-predictor train` first)",
            artifact.display()
        )
    })?;
    Ok(PredictionService::new(Arc::new(context), limits))
}

/// Runs the predict command.
pub fn run(artifact: &Path, limits: InputLimits, args: &PredictArgs) -> Result<()> {
    let service = load_service(artifact, limits)?;

    let at = match args.at.as_deref() {
        Some(raw) => parse_date_time(raw)?,
        None => crate::api::local_now(),
    };
    let request = PredictionRequest::at(args.ambient, args.module, args.irradiation, args.inverter.as_str(), &at);
    let result = service.predict(&request)?;

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "request": request,
                "result": result,
                "formatted": result.formatted(),
            }))?
        );
    } else {
        for (label, value) in details(&request, &at, &result) {
            println!("{:<22} {}", label, value);
        }
    }
    Ok(())
}

/// Runs the inverters command.
pub fn list_inverters(artifact: &Path, limits: InputLimits) -> Result<()> {
    let service = load_service(artifact, limits)?;
    for id in service.inverter_ids() {
        println!("{}", id);
    }
    Ok(())
}
