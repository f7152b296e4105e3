//! Predict command implementation.

use anyhow::{Context, Result};
use enigma_core::{Config, InferencePipeline, PredictionInput};
use serde_json::json;
use std::path::PathBuf;

pub fn execute(config: &Config, input: Option<String>, file: Option<PathBuf>) -> Result<()> {
    let raw = match (input, file) {
        (Some(text), _) => text,
        (None, Some(path)) => {
            std::fs::read_to_string(&path).with_context(|| format!("Failed to read {}", path.display()))?
        }
        (None, None) => anyhow::bail!("Provide a JSON request or --file"),
    };
    let request: serde_json::Value = serde_json::from_str(&raw).context("Request is not valid JSON")?;
    let input = PredictionInput::from_json(&request)?;

    let pipeline = InferencePipeline::from_config(config).context("Failed to load the inference pipeline")?;
    let predictions = pipeline.predict(input)?;

    let model = pipeline.engine().artifact().map(ToString::to_string);
    println!("{}", serde_json::to_string_pretty(&json!({ "model": model, "predictions": predictions }))?);
    Ok(())
}
