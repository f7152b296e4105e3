use crate::error::{TrainingError, TrainingResult};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Extension of persisted model blobs.
pub const BLOB_EXTENSION: &str = "model";

/// Extension of metadata sidecars.
pub const METADATA_EXTENSION: &str = "json";

/// Filesystem layout of the model registry.
///
/// Blobs live at `<root>/<name>_v<version>.model` with the sidecar at
/// `<root>/<name>_v<version>.json`.
#[derive(Debug, Clone)]
pub struct RegistryLayout {
    root: PathBuf,
}

impl RegistryLayout {
    #[must_use]
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn stem(name: &str, version: u32) -> String {
        format!("{name}_v{version}")
    }

    #[must_use]
    pub fn blob_path(&self, name: &str, version: u32) -> PathBuf {
        self.root.join(format!("{}.{BLOB_EXTENSION}", Self::stem(name, version)))
    }

    #[must_use]
    pub fn metadata_path(&self, name: &str, version: u32) -> PathBuf {
        self.root.join(format!("{}.{METADATA_EXTENSION}", Self::stem(name, version)))
    }

    /// Unique scratch file used before a version is claimed.
    ///
    /// Dot-prefixed with a `.tmp` suffix so version scans never match it.
    #[must_use]
    pub fn temp_path(&self, name: &str) -> PathBuf {
        self.root.join(format!(".{name}.{}.tmp", Uuid::new_v4()))
    }

    /// Parses the version out of a blob file name belonging to `name`.
    #[must_use]
    pub fn parse_version(name: &str, file_name: &str) -> Option<u32> {
        file_name
            .strip_suffix(BLOB_EXTENSION)?
            .strip_suffix('.')?
            .strip_prefix(name)?
            .strip_prefix("_v")?
            .parse()
            .ok()
    }

    /// Splits any blob file name into `(name, version)`.
    #[must_use]
    pub fn parse_blob_file(file_name: &str) -> Option<(&str, u32)> {
        let stem = file_name.strip_suffix(BLOB_EXTENSION)?.strip_suffix('.')?;
        let (name, version) = stem.rsplit_once("_v")?;
        if name.is_empty() {
            return None;
        }
        Some((name, version.parse().ok()?))
    }

    pub fn ensure_root(&self) -> TrainingResult<()> {
        std::fs::create_dir_all(&self.root)?;
        Ok(())
    }
}

/// Rejects names that would escape the registry directory or break parsing.
pub fn validate_model_name(name: &str) -> TrainingResult<()> {
    if name.trim().is_empty() {
        return Err(TrainingError::InvalidSpec("model name is required".to_string()));
    }
    if name.contains(['/', '\\']) || name.starts_with('.') {
        return Err(TrainingError::InvalidSpec(format!("invalid model name: {name}")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_layout_paths() {
        let temp = TempDir::new().unwrap();
        let layout = RegistryLayout::new(temp.path().join("registry"));

        assert!(layout.blob_path("clf", 3).ends_with("clf_v3.model"));
        assert!(layout.metadata_path("clf", 3).ends_with("clf_v3.json"));
        assert!(layout.temp_path("clf").to_string_lossy().ends_with(".tmp"));
    }

    #[test]
    fn test_parse_version() {
        assert_eq!(RegistryLayout::parse_version("clf", "clf_v12.model"), Some(12));
        assert_eq!(RegistryLayout::parse_version("clf", "clf_v12.json"), None);
        assert_eq!(RegistryLayout::parse_version("clf", "clf_vx.model"), None);
        // A different model whose name extends this one.
        assert_eq!(RegistryLayout::parse_version("clf", "clf_v1_v2.model"), None);
        assert_eq!(RegistryLayout::parse_version("clf", ".clf.abc.tmp"), None);
    }

    #[test]
    fn test_parse_blob_file() {
        assert_eq!(RegistryLayout::parse_blob_file("my_model_v4.model"), Some(("my_model", 4)));
        assert_eq!(RegistryLayout::parse_blob_file("_v4.model"), None);
        assert_eq!(RegistryLayout::parse_blob_file("notes.txt"), None);
    }

    #[test]
    fn test_validate_model_name() {
        assert!(validate_model_name("baseline_classifier").is_ok());
        assert!(validate_model_name("").is_err());
        assert!(validate_model_name("../escape").is_err());
        assert!(validate_model_name(".hidden").is_err());
    }
}
