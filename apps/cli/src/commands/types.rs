//! Clap definitions for every subcommand.

use clap::Subcommand;
use std::path::PathBuf;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Train a model on the configured dataset and register it
    ///
    /// Loads `data.dataset_path`, splits it into train/val/test, fits the
    /// configured model kind, and saves it as the next registry version.
    Train {
        /// Print the training report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Predict for one record or a list of records given as JSON
    Predict {
        /// JSON object or array of objects
        #[arg(conflicts_with = "file", required_unless_present = "file")]
        input: Option<String>,

        /// Read the JSON request from a file instead
        #[arg(long)]
        file: Option<PathBuf>,
    },

    /// Predict every row of a CSV or Parquet file
    Batch {
        /// Input file (.csv, .parquet, .pq)
        input: PathBuf,

        /// Output file; CSV if no extension is given. Prints CSV to stdout if omitted.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Inspect the model registry
    #[command(subcommand)]
    Models(ModelsCommand),
}

#[derive(Subcommand, Debug)]
pub enum ModelsCommand {
    /// List registered models and their versions
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Re-hash a stored model and compare it with its recorded fingerprint
    Verify {
        /// Model name (defaults to model.registry_name)
        name: Option<String>,

        /// Version to verify (defaults to the latest)
        #[arg(long)]
        version: Option<u32>,
    },
}
