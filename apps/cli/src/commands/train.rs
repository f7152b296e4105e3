//! Train command implementation.

use anyhow::{Context, Result};
use colored::Colorize;
use enigma_core::{Config, StdoutProgressSink, TrainPipeline};

pub fn execute(config: &Config, json: bool) -> Result<()> {
    let mut pipeline = TrainPipeline::from_config(config).context("Failed to set up training")?;
    if !json {
        pipeline = pipeline.with_progress(Box::new(StdoutProgressSink));
    }
    let report = pipeline.run().context("Training failed")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let meta = &report.model_metadata;
    println!();
    println!("{}", "Training complete".bold().green());
    println!("  Model:       {} version {}", meta.model_name.cyan(), meta.version);
    println!("  Path:        {}", meta.file_path.display());
    println!("  Fingerprint: {}", meta.fingerprint_sha256.dimmed());
    println!(
        "  Split:       train={} val={} test={}",
        report.split_sizes.train, report.split_sizes.val, report.split_sizes.test
    );
    println!();
    println!("{} accuracy {:.4}", "Validation".bold(), report.validation_metrics.accuracy);
    print!("{}", report.validation_metrics.report);
    println!();
    println!("{} accuracy {:.4}", "Test".bold(), report.test_metrics.accuracy);
    print!("{}", report.test_metrics.report);
    Ok(())
}
