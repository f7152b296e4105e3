//! Batch command implementation.

use anyhow::{Context, Result};
use colored::Colorize;
use enigma_core::table::write_csv;
use enigma_core::{Config, InferencePipeline};
use std::path::Path;

pub fn execute(config: &Config, input: &Path, output: Option<&Path>) -> Result<()> {
    let pipeline = InferencePipeline::from_config(config).context("Failed to load the inference pipeline")?;
    let result = pipeline
        .batch_predict(input, output)
        .with_context(|| format!("Batch inference failed for {}", input.display()))?;

    match &result.output_path {
        Some(path) => eprintln!(
            "{} {} rows written to {}",
            "✓".green(),
            result.table.n_rows(),
            path.display().to_string().cyan()
        ),
        None => write_csv(&result.table, std::io::stdout().lock())?,
    }
    Ok(())
}
