//! Fingerprint cache gate
//!
//! Regeneration is skipped only when the persisted fingerprint matches the
//! current (manifest path, configuration, mtime) triple exactly and both
//! generated artifacts are present. Anything unexpected about the cache file
//! means "no cache".

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::writer::{COMPILE_DB_FILE_NAME, INDEXER_CONFIG_FILE_NAME};
use crate::io::{FileSystemTrait, RealFileSystem};
use crate::project::paths::to_posix;

/// Fingerprint file written next to the generated artifacts
pub const CACHE_FILE_NAME: &str = ".x2p_parser_cache.json";

/// Inputs that fully determine the generated artifacts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheFingerprint {
    /// Absolute, resolved manifest path
    pub manifest_path: String,
    /// Configuration name as the caller selected it, not the resolved one;
    /// `None` means the manifest default. A default-selection run followed by
    /// an explicit request for the same default configuration therefore
    /// regenerates once.
    pub config_name: Option<String>,
    /// Manifest modification time in nanoseconds since the Unix epoch
    pub mtime_ns: u64,
}

/// Why a persisted fingerprint could not be used
#[derive(Debug, thiserror::Error)]
pub enum CacheReadFailure {
    #[error("cache file is missing")]
    Missing,
    #[error("cache file is unreadable: {0}")]
    Unreadable(#[from] std::io::Error),
    #[error("cache file is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// Decides whether a previous generation can be reused
pub struct CacheGate<F: FileSystemTrait = RealFileSystem> {
    output_dir: PathBuf,
    filesystem: F,
}

impl CacheGate<RealFileSystem> {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self::with_filesystem(output_dir, RealFileSystem)
    }
}

impl<F: FileSystemTrait> CacheGate<F> {
    pub fn with_filesystem(output_dir: impl Into<PathBuf>, filesystem: F) -> Self {
        Self {
            output_dir: output_dir.into(),
            filesystem,
        }
    }

    pub fn cache_path(&self) -> PathBuf {
        self.output_dir.join(CACHE_FILE_NAME)
    }

    /// Compute the fingerprint for the current state of `manifest_path`
    pub fn fingerprint(
        &self,
        manifest_path: &Path,
        config_name: Option<&str>,
    ) -> Result<CacheFingerprint, std::io::Error> {
        let metadata = self.filesystem.metadata(manifest_path)?;
        Ok(CacheFingerprint {
            manifest_path: to_posix(manifest_path),
            config_name: config_name.map(str::to_string),
            mtime_ns: metadata.modified_ns(),
        })
    }

    /// Load the persisted fingerprint, if it can be trusted at all
    pub fn read_fingerprint(&self) -> Result<CacheFingerprint, CacheReadFailure> {
        let path = self.cache_path();
        if !self.filesystem.exists(&path) {
            return Err(CacheReadFailure::Missing);
        }
        let bytes = self.filesystem.read(&path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Both generated artifacts are present in the output directory
    pub fn artifacts_exist(&self) -> bool {
        [COMPILE_DB_FILE_NAME, INDEXER_CONFIG_FILE_NAME]
            .iter()
            .all(|name| self.filesystem.exists(&self.output_dir.join(name)))
    }

    /// True when `current` matches the persisted fingerprint and the artifacts exist
    pub fn is_fresh(&self, current: &CacheFingerprint) -> bool {
        if !self.artifacts_exist() {
            debug!(
                "Generated artifacts missing in {}, regenerating",
                self.output_dir.display()
            );
            return false;
        }

        match self.read_fingerprint() {
            Ok(persisted) if persisted == *current => {
                info!(
                    "Cache hit for {} (configuration: {:?})",
                    current.manifest_path, current.config_name
                );
                true
            }
            Ok(persisted) => {
                debug!(
                    "Fingerprint changed: persisted={:?} current={:?}",
                    persisted, current
                );
                false
            }
            Err(failure) => {
                debug!("Ignoring fingerprint cache: {}", failure);
                false
            }
        }
    }

    /// Compute the current fingerprint and check it in one step
    ///
    /// A manifest whose metadata cannot be read never counts as cached.
    pub fn should_skip(&self, manifest_path: &Path, config_name: Option<&str>) -> bool {
        match self.fingerprint(manifest_path, config_name) {
            Ok(current) => self.is_fresh(&current),
            Err(e) => {
                debug!(
                    "Cannot fingerprint {}: {}",
                    manifest_path.display(),
                    e
                );
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::file_system::TestFileSystem;
    use std::time::{Duration, SystemTime, UNIX_EPOCH};

    const OUTPUT_DIR: &str = "/work/adk";
    const MANIFEST: &str = "/work/adk/projects/app.x2p";

    fn at(seconds: u64) -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(seconds)
    }

    fn fingerprint_json(config_name: Option<&str>, mtime_ns: u64) -> String {
        serde_json::to_string(&CacheFingerprint {
            manifest_path: MANIFEST.to_string(),
            config_name: config_name.map(str::to_string),
            mtime_ns,
        })
        .unwrap()
    }

    /// Output directory holding both artifacts and a fingerprint for DEBUG at t=1000s
    fn cached_filesystem() -> TestFileSystem {
        let fs = TestFileSystem::new();
        fs.set_file_content(MANIFEST, "<project/>", at(1000));
        fs.set_file_content(format!("{OUTPUT_DIR}/{COMPILE_DB_FILE_NAME}"), "[]", at(1001));
        fs.set_file_content(format!("{OUTPUT_DIR}/{INDEXER_CONFIG_FILE_NAME}"), "", at(1001));
        fs.set_file_content(
            format!("{OUTPUT_DIR}/{CACHE_FILE_NAME}"),
            &fingerprint_json(Some("DEBUG"), 1_000_000_000_000),
            at(1001),
        );
        fs
    }

    #[test]
    fn test_matching_fingerprint_with_artifacts_is_a_hit() {
        let gate = CacheGate::with_filesystem(OUTPUT_DIR, cached_filesystem());

        assert!(gate.should_skip(Path::new(MANIFEST), Some("DEBUG")));
    }

    #[test]
    fn test_changed_mtime_forces_regeneration() {
        let fs = cached_filesystem();
        fs.set_file_content(MANIFEST, "<project/>", at(1000) + Duration::from_nanos(1));
        let gate = CacheGate::with_filesystem(OUTPUT_DIR, fs);

        assert!(!gate.should_skip(Path::new(MANIFEST), Some("DEBUG")));
    }

    #[test]
    fn test_changed_configuration_forces_regeneration() {
        let gate = CacheGate::with_filesystem(OUTPUT_DIR, cached_filesystem());

        assert!(!gate.should_skip(Path::new(MANIFEST), Some("RELEASE")));
        assert!(!gate.should_skip(Path::new(MANIFEST), None));
    }

    #[test]
    fn test_different_manifest_path_forces_regeneration() {
        let fs = cached_filesystem();
        fs.set_file_content("/work/adk/projects/other.x2p", "<project/>", at(1000));
        let gate = CacheGate::with_filesystem(OUTPUT_DIR, fs);

        assert!(!gate.should_skip(Path::new("/work/adk/projects/other.x2p"), Some("DEBUG")));
    }

    #[test]
    fn test_missing_artifact_forces_regeneration() {
        for artifact in [COMPILE_DB_FILE_NAME, INDEXER_CONFIG_FILE_NAME] {
            let fs = cached_filesystem();
            fs.remove_file(format!("{OUTPUT_DIR}/{artifact}"));
            let gate = CacheGate::with_filesystem(OUTPUT_DIR, fs);

            assert!(
                !gate.should_skip(Path::new(MANIFEST), Some("DEBUG")),
                "missing {artifact} must not be a cache hit"
            );
        }
    }

    #[test]
    fn test_artifacts_without_fingerprint_force_regeneration() {
        let fs = cached_filesystem();
        fs.remove_file(format!("{OUTPUT_DIR}/{CACHE_FILE_NAME}"));
        let gate = CacheGate::with_filesystem(OUTPUT_DIR, fs);

        assert!(gate.artifacts_exist());
        assert!(matches!(
            gate.read_fingerprint(),
            Err(CacheReadFailure::Missing)
        ));
        assert!(!gate.should_skip(Path::new(MANIFEST), Some("DEBUG")));
    }

    #[test]
    fn test_corrupt_fingerprint_is_treated_as_no_cache() {
        let fs = cached_filesystem();
        fs.set_file_content(
            format!("{OUTPUT_DIR}/{CACHE_FILE_NAME}"),
            "{ not json",
            at(1001),
        );
        let gate = CacheGate::with_filesystem(OUTPUT_DIR, fs);

        assert!(matches!(
            gate.read_fingerprint(),
            Err(CacheReadFailure::Corrupt(_))
        ));
        assert!(!gate.should_skip(Path::new(MANIFEST), Some("DEBUG")));
    }

    #[test]
    fn test_default_selection_round_trips_as_null() {
        let fs = cached_filesystem();
        fs.set_file_content(
            format!("{OUTPUT_DIR}/{CACHE_FILE_NAME}"),
            &fingerprint_json(None, 1_000_000_000_000),
            at(1001),
        );
        let gate = CacheGate::with_filesystem(OUTPUT_DIR, fs);

        assert!(gate.should_skip(Path::new(MANIFEST), None));
        assert!(!gate.should_skip(Path::new(MANIFEST), Some("DEBUG")));
    }

    #[test]
    fn test_unreadable_manifest_is_never_cached() {
        let fs = cached_filesystem();
        fs.remove_file(MANIFEST);
        let gate = CacheGate::with_filesystem(OUTPUT_DIR, fs);

        assert!(!gate.should_skip(Path::new(MANIFEST), Some("DEBUG")));
    }

    #[test]
    fn test_fingerprint_records_nanosecond_mtime() {
        let fs = TestFileSystem::new();
        fs.set_file_content(MANIFEST, "", UNIX_EPOCH + Duration::new(5, 42));
        let gate = CacheGate::with_filesystem(OUTPUT_DIR, fs);

        let fingerprint = gate.fingerprint(Path::new(MANIFEST), Some("A")).unwrap();

        assert_eq!(
            fingerprint,
            CacheFingerprint {
                manifest_path: MANIFEST.to_string(),
                config_name: Some("A".to_string()),
                mtime_ns: 5_000_000_042,
            }
        );
    }
}
