//! Serving-side prediction over a loaded model.

mod engine;

pub use engine::{ArtifactRef, DEFAULT_REGISTRY_NAME, InferenceEngine, PredictionInput, build_feature_matrix};

use enigma_abstraction::ModelError;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum InferenceError {
    #[error("Missing required features: {0:?}")]
    MissingFeatures(Vec<String>),

    #[error("Feature '{column}' at row {row} is not numeric (found {found})")]
    NonNumeric { column: String, row: usize, found: String },

    #[error("Expected feature list is empty")]
    NoFeatures,

    #[error("Invalid prediction input: {0}")]
    InvalidInput(String),

    #[error("Model returned {actual} predictions for {expected} rows")]
    PredictionCount { expected: usize, actual: usize },

    #[error(transparent)]
    Model(#[from] ModelError),
}
