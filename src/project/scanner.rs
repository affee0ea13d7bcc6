use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

use crate::project::ProjectError;
use crate::project::manifest::MANIFEST_EXTENSION;

/// Directory names that never hold project manifests worth offering
pub const DEFAULT_IGNORED_DIRECTORIES: [&str; 3] = [".git", "build", "depend_"];

/// Options for configuring manifest discovery
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Directory names pruned from the walk (exact name match)
    pub ignored_directories: Vec<String>,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            ignored_directories: DEFAULT_IGNORED_DIRECTORIES
                .iter()
                .map(|name| name.to_string())
                .collect(),
        }
    }
}

/// Recursive discovery of `.x2p` manifests below a root directory
pub struct ManifestScanner {
    options: ScanOptions,
}

impl ManifestScanner {
    pub fn new(options: ScanOptions) -> Self {
        Self { options }
    }

    /// Return every manifest below `root_path`, sorted by path
    pub fn scan(&self, root_path: &Path) -> Result<Vec<PathBuf>, ProjectError> {
        if !root_path.exists() {
            return Err(ProjectError::PathNotFound {
                path: root_path.to_string_lossy().to_string(),
            });
        }

        if !root_path.is_dir() {
            return Err(ProjectError::NotADirectory {
                path: root_path.to_string_lossy().to_string(),
            });
        }

        let mut manifests = Vec::new();
        for entry in WalkDir::new(root_path)
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || !self.is_ignored(entry))
        {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    // Log the error but continue scanning
                    tracing::warn!("Failed to access directory entry: {}", e);
                    continue;
                }
            };

            if entry.file_type().is_file()
                && entry
                    .path()
                    .extension()
                    .is_some_and(|extension| extension == MANIFEST_EXTENSION)
            {
                manifests.push(entry.into_path());
            }
        }

        manifests.sort();
        tracing::debug!(
            "Found {} manifests under {}",
            manifests.len(),
            root_path.display()
        );
        Ok(manifests)
    }

    fn is_ignored(&self, entry: &DirEntry) -> bool {
        entry.file_type().is_dir()
            && self
                .options
                .ignored_directories
                .iter()
                .any(|ignored| entry.file_name() == ignored.as_str())
    }
}

impl Default for ManifestScanner {
    fn default() -> Self {
        Self::new(ScanOptions::default())
    }
}
