//! Artifact serialization
//!
//! Writes `compile_commands.json`, `.clangd` and the fingerprint file. Every
//! file is replaced through a sibling temporary file and a rename, and the
//! fingerprint is removed before and written after the artifacts, so an
//! interrupted run always looks like "no cache" to the next one.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::cache::{CACHE_FILE_NAME, CacheFingerprint};
use super::error::GeneratorError;
use super::isolation::SkipRule;
use crate::project::CompileEntry;
use crate::project::paths::to_posix;

pub const COMPILE_DB_FILE_NAME: &str = "compile_commands.json";
pub const INDEXER_CONFIG_FILE_NAME: &str = ".clangd";

/// Flags added before the configuration's defines and include paths
pub const BASELINE_COMPILE_FLAGS: [&str; 3] = ["-xc", "-std=c11", "-Wall"];

/// Escape a value for a double-quoted YAML scalar
pub fn escape_yaml(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Render the `.clangd` configuration text
pub fn render_indexer_config(
    defines: &[String],
    include_paths: &[PathBuf],
    skip_rules: &[SkipRule],
) -> String {
    let mut yaml = String::from("CompileFlags:\n  Add:\n");
    for flag in BASELINE_COMPILE_FLAGS {
        yaml.push_str(&format!("    - \"{flag}\"\n"));
    }
    for define in defines {
        yaml.push_str(&format!("    - \"-D{}\"\n", escape_yaml(define)));
    }
    for include in include_paths {
        yaml.push_str(&format!("    - \"-I{}\"\n", escape_yaml(&to_posix(include))));
    }

    yaml.push_str("\nIndex:\n  Background:\n    Skip:\n");
    for rule in skip_rules {
        yaml.push_str(&format!("      - \"{}\"\n", escape_yaml(&rule.anchored())));
    }
    yaml
}

/// Paths of the files produced by one successful write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenArtifacts {
    pub compile_db: PathBuf,
    pub indexer_config: PathBuf,
    pub fingerprint: PathBuf,
}

/// Serializes generation results into an output directory
pub struct ConfigWriter {
    output_dir: PathBuf,
}

impl ConfigWriter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn ensure_output_dir(&self) -> Result<(), GeneratorError> {
        fs::create_dir_all(&self.output_dir).map_err(|source| {
            GeneratorError::OutputDirectoryCreateFailure {
                path: self.output_dir.clone(),
                source,
            }
        })
    }

    /// Replace all artifacts and persist `fingerprint` last
    pub fn write(
        &self,
        entries: &[CompileEntry],
        defines: &[String],
        include_paths: &[PathBuf],
        skip_rules: &[SkipRule],
        fingerprint: &CacheFingerprint,
    ) -> Result<WrittenArtifacts, GeneratorError> {
        self.ensure_output_dir()?;

        let artifacts = WrittenArtifacts {
            compile_db: self.output_dir.join(COMPILE_DB_FILE_NAME),
            indexer_config: self.output_dir.join(INDEXER_CONFIG_FILE_NAME),
            fingerprint: self.output_dir.join(CACHE_FILE_NAME),
        };

        match fs::remove_file(&artifacts.fingerprint) {
            Ok(()) => debug!("Removed stale fingerprint {}", artifacts.fingerprint.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(source) => {
                return Err(GeneratorError::ArtifactWriteFailure {
                    path: artifacts.fingerprint.clone(),
                    source,
                });
            }
        }

        let compile_db = serde_json::to_string_pretty(entries).map_err(|source| {
            GeneratorError::Serialization {
                artifact: COMPILE_DB_FILE_NAME,
                source,
            }
        })?;
        write_atomic(&artifacts.compile_db, compile_db.as_bytes())?;

        let indexer_config = render_indexer_config(defines, include_paths, skip_rules);
        write_atomic(&artifacts.indexer_config, indexer_config.as_bytes())?;

        let fingerprint_json =
            serde_json::to_string(fingerprint).map_err(|source| GeneratorError::Serialization {
                artifact: CACHE_FILE_NAME,
                source,
            })?;
        write_atomic(&artifacts.fingerprint, fingerprint_json.as_bytes())?;

        info!(
            "Wrote {} compile entries and {} skip rules to {}",
            entries.len(),
            skip_rules.len(),
            self.output_dir.display()
        );
        Ok(artifacts)
    }
}

/// Write `contents` to `path` via a temporary sibling and a rename
fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), GeneratorError> {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default();
    let temp_path = path.with_file_name(format!("{file_name}.tmp"));

    let to_write_failure = |source| GeneratorError::ArtifactWriteFailure {
        path: path.to_path_buf(),
        source,
    };

    if let Err(source) = fs::write(&temp_path, contents) {
        let _ = fs::remove_file(&temp_path);
        return Err(to_write_failure(source));
    }
    if let Err(source) = fs::rename(&temp_path, path) {
        let _ = fs::remove_file(&temp_path);
        return Err(to_write_failure(source));
    }
    Ok(())
}
