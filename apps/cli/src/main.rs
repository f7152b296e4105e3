//! Enigma CLI - train, register, and serve tabular classifiers.
//!
//! Every command reads the same configuration file, so the training run and
//! the inference runs that follow it agree on features and preprocessing.

mod commands;
mod logging;

use anyhow::Context;
use clap::Parser;
use commands::{Command, batch, models, predict, train};
use enigma_core::{Config, DEFAULT_CONFIG_PATH};
use std::path::PathBuf;

/// Enigma - config-driven training and inference for tabular classifiers
#[derive(Parser, Debug)]
#[command(name = "enigma", author, version, about = "Train, register, and serve tabular classifiers")]
struct Args {
    /// Path to the YAML configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH, global = true)]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,

    /// Log output format
    #[arg(long, value_enum, default_value_t = logging::LogFormat::Text, global = true)]
    log_format: logging::LogFormat,

    #[command(subcommand)]
    command: Command,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logging::init(&args.log_level, args.log_format)?;

    let config = Config::load(&args.config)
        .with_context(|| format!("Failed to load configuration from {}", args.config.display()))?;
    tracing::debug!(path = %args.config.display(), "Configuration loaded");

    match args.command {
        Command::Train { json } => train::execute(&config, json),
        Command::Predict { input, file } => predict::execute(&config, input, file),
        Command::Batch { input, output } => batch::execute(&config, &input, output.as_deref()),
        Command::Models(command) => models::execute(&config, command),
    }
}
