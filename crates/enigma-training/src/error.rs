use enigma_abstraction::ModelError;
use thiserror::Error;

pub type TrainingResult<T> = std::result::Result<T, TrainingError>;

#[derive(Debug, Error)]
pub enum TrainingError {
    #[error("invalid training spec: {0}")]
    InvalidSpec(String),

    #[error("dataset error: {0}")]
    Dataset(String),

    /// No blob is persisted for the requested name (and version, when one was given).
    #[error("artifact not found: {name}{}", version.map(|v| format!(" v{v}")).unwrap_or_default())]
    ArtifactNotFound { name: String, version: Option<u32> },

    #[error("artifact error: {0}")]
    Artifact(String),

    #[error("could not claim a version for '{name}' after {attempts} attempts")]
    VersionConflict { name: String, attempts: u32 },

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
