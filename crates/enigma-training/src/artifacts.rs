use crate::error::TrainingResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

/// Sidecar record written next to every persisted model blob.
///
/// Field names are part of the on-disk format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactMetadata {
    pub model_name: String,
    pub version: u32,
    pub file_path: PathBuf,
    pub fingerprint_sha256: String,
    pub timestamp: DateTime<Utc>,
    pub size_kb: f64,
}

/// A blob read back from the registry.
#[derive(Debug, Clone)]
pub struct LoadedArtifact {
    pub name: String,
    pub version: u32,
    pub path: PathBuf,
    pub bytes: Vec<u8>,
    /// `None` when the sidecar is absent; the blob stays authoritative.
    pub metadata: Option<ArtifactMetadata>,
}

/// Result of re-hashing a persisted blob against its sidecar.
#[derive(Debug, Clone, PartialEq)]
pub struct Verification {
    pub metadata: ArtifactMetadata,
    pub actual_fingerprint: String,
}

impl Verification {
    pub fn is_valid(&self) -> bool {
        self.metadata.fingerprint_sha256 == self.actual_fingerprint
    }
}

/// SHA-256 of a file, streamed from disk.
pub fn sha256_file(path: &Path) -> TrainingResult<String> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut hasher = Sha256::new();
    std::io::copy(&mut reader, &mut hasher)?;
    Ok(hex::encode(hasher.finalize()))
}

/// SHA-256 of an in-memory buffer.
pub fn sha256_bytes(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// File size in KiB rounded to two decimals.
pub fn size_kb(len: u64) -> f64 {
    ((len as f64 / 1024.0) * 100.0).round() / 100.0
}
