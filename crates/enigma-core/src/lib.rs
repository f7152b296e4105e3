//! Enigma Core - train and serve tabular classifiers from a single config.
//!
//! This crate provides:
//! - The configuration store with environment overrides
//! - A column-oriented [`Table`] with CSV and Parquet I/O
//! - The schema pipeline shared by training and inference
//! - The inference engine and the train/infer orchestration flows
//!
//! # Example
//!
//! ```rust,no_run
//! use enigma_core::{Config, InferencePipeline, TrainPipeline};
//! use std::path::Path;
//!
//! fn main() -> enigma_core::Result<()> {
//!     let config = Config::load(Path::new("config/config.yaml"))?;
//!     let report = TrainPipeline::from_config(&config)?.run()?;
//!     println!("saved version {}", report.model_metadata.version);
//!
//!     let pipeline = InferencePipeline::from_config(&config)?;
//!     pipeline.batch_predict(Path::new("data/new.csv"), Some(Path::new("out/preds")))?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod inference;
pub mod pipelines;
pub mod schema;
pub mod table;

pub use config::{Config, ConfigError, DEFAULT_CONFIG_PATH};
pub use error::{EnigmaError, Result};
pub use inference::{InferenceEngine, InferenceError, PredictionInput};
pub use pipelines::{
    BatchOutput, DEFAULT_REGISTRY_DIR, InferencePipeline, PREDICTION_COLUMN, SplitSizes, TrainPipeline,
    TrainReport, TrainSettings, open_registry,
};
pub use schema::{CastType, FeatureSchema, SchemaError, SchemaPipeline, Stage, StageObserver};
pub use table::{Column, Record, Table, TableError, TableFormat};

pub use enigma_abstraction::{Classifier, FeatureMatrix, ModelError, Value};
pub use enigma_models::{ModelFactory, ModelParams};
pub use enigma_training::{
    ArtifactMetadata, ArtifactRegistry, EvaluationMetrics, ProgressEvent, ProgressSink, StdoutProgressSink,
    TrainingError, Verification,
};
