//! Error types for Enigma Core.

use crate::config::ConfigError;
use crate::inference::InferenceError;
use crate::schema::SchemaError;
use crate::table::TableError;
use enigma_abstraction::ModelError;
use enigma_training::TrainingError;
use std::path::PathBuf;
use thiserror::Error;

/// Core error type for Enigma operations.
#[derive(Error, Debug)]
pub enum EnigmaError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    /// Required columns missing or a type cast failed
    #[error("Schema validation error: {0}")]
    SchemaValidation(#[from] SchemaError),

    /// Registry lookups that found nothing
    #[error("Artifact not found: {name}{}", version.map(|v| format!(" v{v}")).unwrap_or_default())]
    ArtifactNotFound { name: String, version: Option<u32> },

    /// Batch input or output extension is not csv or parquet
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Batch or training input does not exist
    #[error("Dataset not found: {}", .0.display())]
    DatasetNotFound(PathBuf),

    /// Preprocessing removed rows, so predictions no longer line up with the input
    #[error("Prediction count {predictions} does not match {rows} input rows")]
    RowCountMismatch { rows: usize, predictions: usize },

    /// Inference errors
    #[error("Inference error: {0}")]
    Inference(#[from] InferenceError),

    /// Model errors
    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    /// Training, split, and registry errors
    #[error("Training error: {0}")]
    Training(TrainingError),

    /// Malformed in-memory tables
    #[error("Table error: {0}")]
    Table(#[from] TableError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV errors
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Parquet errors
    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    /// Arrow errors
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),
}

impl From<TrainingError> for EnigmaError {
    fn from(err: TrainingError) -> Self {
        match err {
            TrainingError::ArtifactNotFound { name, version } => Self::ArtifactNotFound { name, version },
            TrainingError::Model(e) => Self::Model(e),
            TrainingError::Io(e) => Self::Io(e),
            other => Self::Training(other),
        }
    }
}

/// Result type alias for Enigma operations.
pub type Result<T> = std::result::Result<T, EnigmaError>;
