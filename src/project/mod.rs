//! Project manifest handling
//!
//! Loading `.x2p` manifests, resolving their paths, discovering them on disk
//! and modelling the compilation database derived from them.

pub mod compilation_database;
pub mod error;
pub mod manifest;
pub mod paths;
pub mod scanner;

pub use compilation_database::{
    CompilationDatabase, CompilationDatabaseError, CompileEntry, build_compile_entries,
};
pub use error::{ManifestError, ProjectError};
pub use manifest::{
    ConfigSelection, Configuration, ProjectManifest, ResolvedManifest, parse_manifest,
};
pub use scanner::{ManifestScanner, ScanOptions};
