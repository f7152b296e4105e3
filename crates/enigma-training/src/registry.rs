use crate::artifacts::{
    ArtifactMetadata, LoadedArtifact, Verification, sha256_file, size_kb,
};
use crate::error::{TrainingError, TrainingResult};
use crate::layout::{RegistryLayout, validate_model_name};
use chrono::Utc;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// How many times `save` re-reads the version list after losing a claim race.
const MAX_CLAIM_ATTEMPTS: u32 = 64;

/// Versioned, fingerprinted storage for model blobs.
///
/// Versions for a name start at 1 and are claimed atomically: the blob is
/// written to a scratch file and then hard-linked into its versioned name,
/// which fails if another writer already owns that version. Concurrent saves
/// for the same name therefore never overwrite each other.
#[derive(Debug, Clone)]
pub struct ArtifactRegistry {
    layout: RegistryLayout,
}

impl ArtifactRegistry {
    /// Opens (and creates, if needed) a registry rooted at `root`.
    pub fn open(root: impl Into<PathBuf>) -> TrainingResult<Self> {
        let layout = RegistryLayout::new(root.into());
        layout.ensure_root()?;
        info!(registry_dir = %layout.root().display(), "Model registry initialized");
        Ok(Self { layout })
    }

    #[must_use]
    pub fn layout(&self) -> &RegistryLayout {
        &self.layout
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        self.layout.root()
    }

    /// Existing versions of `name`, ascending. Gaps are preserved.
    pub fn versions(&self, name: &str) -> TrainingResult<Vec<u32>> {
        let dir = match fs::read_dir(self.layout.root()) {
            Ok(d) => d,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut versions = Vec::new();
        for entry in dir {
            let entry = entry?;
            let file_name = entry.file_name();
            let Some(file_name) = file_name.to_str() else {
                continue;
            };
            if let Some(v) = RegistryLayout::parse_version(name, file_name) {
                versions.push(v);
            }
        }
        versions.sort_unstable();
        Ok(versions)
    }

    /// Highest existing version of `name`, if any.
    pub fn latest_version(&self, name: &str) -> TrainingResult<Option<u32>> {
        Ok(self.versions(name)?.last().copied())
    }

    /// Every model name in the registry with its versions.
    pub fn list(&self) -> TrainingResult<BTreeMap<String, Vec<u32>>> {
        let mut out: BTreeMap<String, Vec<u32>> = BTreeMap::new();
        let dir = match fs::read_dir(self.layout.root()) {
            Ok(d) => d,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(out),
            Err(e) => return Err(e.into()),
        };
        for entry in dir {
            let entry = entry?;
            let file_name = entry.file_name();
            if let Some((name, version)) = file_name.to_str().and_then(RegistryLayout::parse_blob_file) {
                out.entry(name.to_string()).or_default().push(version);
            }
        }
        for versions in out.values_mut() {
            versions.sort_unstable();
        }
        Ok(out)
    }

    /// Persists `blob` as the next version of `name` and writes its sidecar.
    ///
    /// The fingerprint is computed from the persisted file, not from `blob`.
    pub fn save(&self, blob: &[u8], name: &str) -> TrainingResult<ArtifactMetadata> {
        validate_model_name(name)?;
        self.layout.ensure_root()?;

        let temp = self.layout.temp_path(name);
        if let Err(e) = write_synced(&temp, blob) {
            let _ = fs::remove_file(&temp);
            return Err(e.into());
        }

        let claimed = self.claim_version(&temp, name);
        let _ = fs::remove_file(&temp);
        let (version, blob_path) = claimed?;

        let fingerprint = sha256_file(&blob_path)?;
        let metadata = ArtifactMetadata {
            model_name: name.to_string(),
            version,
            file_path: blob_path.clone(),
            fingerprint_sha256: fingerprint,
            timestamp: Utc::now(),
            size_kb: size_kb(fs::metadata(&blob_path)?.len()),
        };
        self.write_metadata(&metadata)?;

        info!(
            model_name = %name,
            version,
            path = %blob_path.display(),
            fingerprint = %metadata.fingerprint_sha256,
            "Saved model artifact"
        );
        Ok(metadata)
    }

    fn claim_version(&self, temp: &Path, name: &str) -> TrainingResult<(u32, PathBuf)> {
        for attempt in 0..MAX_CLAIM_ATTEMPTS {
            let version = self.latest_version(name)?.unwrap_or(0) + 1;
            let target = self.layout.blob_path(name, version);
            match fs::hard_link(temp, &target) {
                Ok(()) => return Ok((version, target)),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    debug!(model_name = %name, version, attempt, "Version already claimed, retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(TrainingError::VersionConflict { name: name.to_string(), attempts: MAX_CLAIM_ATTEMPTS })
    }

    fn write_metadata(&self, metadata: &ArtifactMetadata) -> TrainingResult<()> {
        let path = self.layout.metadata_path(&metadata.model_name, metadata.version);
        let temp = path.with_extension("json.tmp");
        let json = serde_json::to_vec_pretty(metadata)?;
        write_synced(&temp, &json)?;
        fs::rename(&temp, &path).map_err(|e| {
            let _ = fs::remove_file(&temp);
            e
        })?;
        Ok(())
    }

    /// Loads a blob; `version = None` resolves to the latest one.
    ///
    /// A missing blob is always an error. A missing sidecar is only logged.
    pub fn load(&self, name: &str, version: Option<u32>) -> TrainingResult<LoadedArtifact> {
        validate_model_name(name)?;
        let version = match version {
            Some(v) => v,
            None => self
                .latest_version(name)?
                .ok_or_else(|| TrainingError::ArtifactNotFound { name: name.to_string(), version: None })?,
        };

        let path = self.layout.blob_path(name, version);
        let bytes = match fs::read(&path) {
            Ok(b) => b,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(TrainingError::ArtifactNotFound {
                    name: name.to_string(),
                    version: Some(version),
                });
            }
            Err(e) => return Err(e.into()),
        };

        let metadata = self.metadata(name, version)?;
        match &metadata {
            Some(meta) => info!(
                model_name = %name,
                version,
                fingerprint = %meta.fingerprint_sha256,
                timestamp = %meta.timestamp,
                "Loaded model artifact"
            ),
            None => warn!(model_name = %name, version, "No metadata file found for this model version"),
        }

        Ok(LoadedArtifact { name: name.to_string(), version, path, bytes, metadata })
    }

    /// Reads the sidecar for `(name, version)` if it exists.
    pub fn metadata(&self, name: &str, version: u32) -> TrainingResult<Option<ArtifactMetadata>> {
        match fs::read(self.layout.metadata_path(name, version)) {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Re-hashes a persisted blob and compares it with its sidecar.
    pub fn verify(&self, name: &str, version: Option<u32>) -> TrainingResult<Verification> {
        let artifact = self.load(name, version)?;
        let metadata = artifact.metadata.ok_or_else(|| {
            TrainingError::Artifact(format!(
                "cannot verify {}: metadata sidecar is missing",
                RegistryLayout::stem(name, artifact.version)
            ))
        })?;
        let actual_fingerprint = sha256_file(&artifact.path)?;
        let verification = Verification { metadata, actual_fingerprint };
        if !verification.is_valid() {
            warn!(model_name = %name, version = artifact.version, "Fingerprint mismatch");
        }
        Ok(verification)
    }
}

fn write_synced(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::sha256_bytes;
    use tempfile::TempDir;

    fn registry() -> (TempDir, ArtifactRegistry) {
        let temp = TempDir::new().unwrap();
        let registry = ArtifactRegistry::open(temp.path().join("registry")).unwrap();
        (temp, registry)
    }

    #[test]
    fn test_open_creates_directory() {
        let (temp, _) = registry();
        assert!(temp.path().join("registry").is_dir());
    }

    #[test]
    fn test_sequential_saves_are_contiguous() {
        let (_temp, registry) = registry();
        for i in 1..=5u32 {
            let meta = registry.save(format!("blob-{i}").as_bytes(), "clf").unwrap();
            assert_eq!(meta.version, i);
        }
        assert_eq!(registry.versions("clf").unwrap(), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_versions_are_per_name() {
        let (_temp, registry) = registry();
        registry.save(b"a", "alpha").unwrap();
        registry.save(b"a", "alpha").unwrap();
        let meta = registry.save(b"b", "beta").unwrap();
        assert_eq!(meta.version, 1);
    }

    #[test]
    fn test_fingerprint_is_content_hash() {
        let (_temp, registry) = registry();
        let a = registry.save(b"same bytes", "one").unwrap();
        let b = registry.save(b"same bytes", "two").unwrap();
        let c = registry.save(b"other bytes", "one").unwrap();

        assert_eq!(a.fingerprint_sha256, b.fingerprint_sha256);
        assert_eq!(a.fingerprint_sha256, sha256_bytes(b"same bytes"));
        assert_ne!(a.fingerprint_sha256, c.fingerprint_sha256);
    }

    #[test]
    fn test_sidecar_written() {
        let (_temp, registry) = registry();
        let meta = registry.save(&[0u8; 2048], "clf").unwrap();
        let on_disk = registry.metadata("clf", 1).unwrap().unwrap();
        assert_eq!(on_disk, meta);
        assert!((meta.size_kb - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_load_latest_and_specific() {
        let (_temp, registry) = registry();
        registry.save(b"v1", "clf").unwrap();
        registry.save(b"v2", "clf").unwrap();

        let latest = registry.load("clf", None).unwrap();
        assert_eq!(latest.version, 2);
        assert_eq!(latest.bytes, b"v2");

        let first = registry.load("clf", Some(1)).unwrap();
        assert_eq!(first.bytes, b"v1");
    }

    #[test]
    fn test_load_missing_is_error() {
        let (_temp, registry) = registry();
        assert!(matches!(
            registry.load("clf", None),
            Err(TrainingError::ArtifactNotFound { version: None, .. })
        ));

        registry.save(b"v1", "clf").unwrap();
        assert!(matches!(
            registry.load("clf", Some(9)),
            Err(TrainingError::ArtifactNotFound { version: Some(9), .. })
        ));
    }

    #[test]
    fn test_load_tolerates_missing_sidecar() {
        let (_temp, registry) = registry();
        registry.save(b"v1", "clf").unwrap();
        fs::remove_file(registry.layout().metadata_path("clf", 1)).unwrap();

        let loaded = registry.load("clf", None).unwrap();
        assert!(loaded.metadata.is_none());
        assert_eq!(loaded.bytes, b"v1");
    }

    #[test]
    fn test_gap_does_not_renumber() {
        let (_temp, registry) = registry();
        for _ in 0..3 {
            registry.save(b"x", "clf").unwrap();
        }
        fs::remove_file(registry.layout().blob_path("clf", 2)).unwrap();

        assert_eq!(registry.versions("clf").unwrap(), vec![1, 3]);
        assert_eq!(registry.save(b"y", "clf").unwrap().version, 4);
        assert_eq!(registry.load("clf", None).unwrap().version, 4);
    }

    #[test]
    fn test_verify_detects_tampering() {
        let (_temp, registry) = registry();
        registry.save(b"original", "clf").unwrap();
        assert!(registry.verify("clf", Some(1)).unwrap().is_valid());

        fs::write(registry.layout().blob_path("clf", 1), b"tampered").unwrap();
        assert!(!registry.verify("clf", Some(1)).unwrap().is_valid());
    }

    #[test]
    fn test_list_groups_by_name() {
        let (_temp, registry) = registry();
        registry.save(b"a", "alpha").unwrap();
        registry.save(b"a", "alpha").unwrap();
        registry.save(b"b", "beta_model").unwrap();

        let listed = registry.list().unwrap();
        assert_eq!(listed["alpha"], vec![1, 2]);
        assert_eq!(listed["beta_model"], vec![1]);
    }

    #[test]
    fn test_no_scratch_files_left_behind() {
        let (_temp, registry) = registry();
        registry.save(b"a", "clf").unwrap();
        let leftovers: Vec<_> = fs::read_dir(registry.root())
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }
}
