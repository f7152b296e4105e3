//! Enigma Training
//!
//! Model-agnostic training primitives for:
//! - Persisting versioned, fingerprinted model artifacts (`ArtifactRegistry`)
//! - Splitting datasets into train/validation/test partitions
//! - Scoring predictions (`evaluate`)
//! - Reporting progress of a training run (`ProgressSink`)

pub mod artifacts;
pub mod error;
pub mod layout;
pub mod metrics;
pub mod progress;
pub mod registry;
pub mod split;

pub use artifacts::{ArtifactMetadata, LoadedArtifact, Verification, sha256_bytes, sha256_file};
pub use error::{TrainingError, TrainingResult};
pub use layout::{BLOB_EXTENSION, METADATA_EXTENSION, RegistryLayout};
pub use metrics::{ClassMetrics, ClassificationReport, EvaluationMetrics, evaluate};
pub use progress::{
    ProgressEvent, ProgressSink, StdoutProgressSink, TracingProgressSink, TrainStage, TrainingRunId,
};
pub use registry::ArtifactRegistry;
pub use split::{DEFAULT_SEED, SplitFractions, SplitIndices, shuffle_split, split_indices};
