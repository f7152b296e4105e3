//! End-to-end flows composed from the config store, schema pipeline,
//! registry, and inference engine.

mod inference;
mod train;

pub use inference::{BatchOutput, InferencePipeline, PREDICTION_COLUMN};
pub use train::{SplitSizes, TrainPipeline, TrainReport, TrainSettings};

use crate::config::Config;
use crate::error::Result;
use enigma_training::ArtifactRegistry;
use std::path::PathBuf;

/// Default value of `models.registry_dir`.
pub const DEFAULT_REGISTRY_DIR: &str = "models/registry";

/// Opens the registry named by `models.registry_dir`.
pub fn open_registry(config: &Config) -> Result<ArtifactRegistry> {
    let dir: PathBuf = config.get_as_or("models.registry_dir", PathBuf::from(DEFAULT_REGISTRY_DIR))?;
    Ok(ArtifactRegistry::open(dir)?)
}
