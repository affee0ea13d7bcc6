use json_compilation_db::Entry;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::paths::to_posix;

/// Compiler named in every generated entry
pub const DEFAULT_COMPILER: &str = "/usr/bin/gcc";

/// Build subdirectory object files are nominally placed in
pub const OBJECT_OUTPUT_DIR: &str = "build";

#[derive(Error, Debug)]
pub enum CompilationDatabaseError {
    #[error("Compilation database file not found: {path}")]
    FileNotFound { path: String },
    #[error("Failed to read compilation database file: {error}")]
    ReadError { error: String },
    #[error("Failed to parse compilation database JSON: {error}")]
    ParseError { error: String },
}

/// One `compile_commands.json` entry as written by the generator
///
/// Entries deliberately carry no defines or include flags; those are added
/// once for every file through the `.clangd` configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompileEntry {
    pub directory: String,
    pub arguments: Vec<String>,
    pub file: String,
}

impl CompileEntry {
    /// Minimal compile-only invocation for `source` run from `output_dir`
    pub fn for_source(source: &Path, output_dir: &Path) -> Self {
        let source_posix = to_posix(source);
        let object_name = source
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default();

        Self {
            directory: to_posix(output_dir),
            arguments: vec![
                DEFAULT_COMPILER.to_string(),
                "-c".to_string(),
                source_posix.clone(),
                "-o".to_string(),
                format!("{OBJECT_OUTPUT_DIR}/{object_name}.o"),
            ],
            file: source_posix,
        }
    }
}

/// Build one entry per source file, preserving discovery order
pub fn build_compile_entries(source_files: &[PathBuf], output_dir: &Path) -> Vec<CompileEntry> {
    source_files
        .iter()
        .map(|source| CompileEntry::for_source(source, output_dir))
        .collect()
}

/// Read-only view of an existing compilation database on disk
#[derive(Debug)]
pub struct CompilationDatabase {
    /// Path to the compilation database file (compile_commands.json)
    pub path: PathBuf,
    /// Parsed entries in file order
    pub entries: Vec<Entry>,
}

impl CompilationDatabase {
    /// Load and parse the compilation database at `path`
    ///
    /// An empty array is a valid database here: a manifest without C sources
    /// produces one.
    pub fn load(path: PathBuf) -> Result<Self, CompilationDatabaseError> {
        if !path.exists() {
            return Err(CompilationDatabaseError::FileNotFound {
                path: path.to_string_lossy().to_string(),
            });
        }

        let file = std::fs::File::open(&path).map_err(|e| CompilationDatabaseError::ReadError {
            error: e.to_string(),
        })?;

        let reader = std::io::BufReader::new(file);
        let entries: Vec<Entry> =
            serde_json::from_reader(reader).map_err(|e| CompilationDatabaseError::ParseError {
                error: e.to_string(),
            })?;

        Ok(Self { path, entries })
    }

    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }
}
