//! Error types for clangd configuration generation

use std::path::PathBuf;

use crate::project::ManifestError;

/// Every way a generation request can fail
///
/// None of these are retried; the MCP layer turns them into status text.
#[derive(Debug, thiserror::Error)]
pub enum GeneratorError {
    /// Neither the caller nor the environment named a manifest
    #[error(
        "No manifest path given and ADK_ACTIVE_X2P is not set; specify the target .x2p project explicitly"
    )]
    ManifestPathNotProvided,

    /// Manifest loading, parsing or configuration selection failed
    #[error(transparent)]
    Manifest(#[from] ManifestError),

    /// The manifest exists but its modification time cannot be read
    #[error("Failed to read manifest metadata {path}: {source}")]
    ManifestMetadata {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The process working directory is needed to resolve a relative path
    #[error("Failed to determine the current directory: {0}")]
    WorkingDirectory(#[source] std::io::Error),

    #[error("Failed to create output directory {path}: {source}")]
    OutputDirectoryCreateFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    ArtifactWriteFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize {artifact}: {source}")]
    Serialization {
        artifact: &'static str,
        #[source]
        source: serde_json::Error,
    },
}
