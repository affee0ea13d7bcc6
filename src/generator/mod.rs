//! clangd configuration generator
//!
//! Runs one generation request end to end:
//!
//! 1. [`CacheGate`] compares the manifest fingerprint with the persisted one
//!    and stops early on a hit.
//! 2. The manifest is parsed and the configuration selected.
//! 3. Compile entries and skip rules are derived independently.
//! 4. [`ConfigWriter`] replaces the artifacts and persists the fingerprint.
//! 5. The artifact names are recorded in `.gitignore`.

pub mod cache;
pub mod error;
pub mod gitignore;
pub mod isolation;
pub mod writer;

use std::fmt;
use std::path::PathBuf;

use tracing::{info, instrument, warn};

pub use cache::{CACHE_FILE_NAME, CacheFingerprint, CacheGate};
pub use error::GeneratorError;
pub use isolation::{DEFAULT_DEEP_ISOLATION_ROOT, IsolationAnalyzer, SkipRule};
pub use writer::{COMPILE_DB_FILE_NAME, ConfigWriter, INDEXER_CONFIG_FILE_NAME, WrittenArtifacts};

use crate::project::{ConfigSelection, ManifestError, build_compile_entries, parse_manifest};

/// Files recorded in the output directory's `.gitignore`
pub const IGNORED_ARTIFACTS: [&str; 3] =
    [CACHE_FILE_NAME, INDEXER_CONFIG_FILE_NAME, COMPILE_DB_FILE_NAME];

/// Fully resolved input of one generation run
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    /// Absolute, resolved manifest path
    pub manifest_path: PathBuf,
    /// Absolute, resolved output directory
    pub output_dir: PathBuf,
    pub selection: ConfigSelection,
    /// Relative to `output_dir`; `None` disables the deep isolation pass
    pub deep_isolation_root: Option<PathBuf>,
    /// Regenerate even when the fingerprint matches
    pub force: bool,
}

/// Summary of a run that rewrote the artifacts
#[derive(Debug, Clone)]
pub struct GenerationReport {
    pub manifest_name: String,
    pub configuration: String,
    pub entry_count: usize,
    pub skip_rules: Vec<SkipRule>,
    pub artifacts: WrittenArtifacts,
}

#[derive(Debug, Clone)]
pub enum GenerationOutcome {
    /// Nothing was written; the existing artifacts are current
    CacheHit {
        manifest_name: String,
        selection: Option<String>,
    },
    Generated(GenerationReport),
}

impl fmt::Display for GenerationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CacheHit {
                manifest_name,
                selection,
            } => write!(
                f,
                "Cache hit: {} (configuration: {}) is unchanged, skipped regeneration. Code analysis can proceed.",
                manifest_name,
                selection.as_deref().unwrap_or("<manifest default>")
            ),
            Self::Generated(report) => write!(
                f,
                "Generation succeeded (cache and {} updated)\n1. Project: {} (configuration: {})\n2. Wrote {} compile entries to {} and {}, isolating {} unrelated directories.",
                gitignore::GITIGNORE_FILE_NAME,
                report.manifest_name,
                report.configuration,
                report.entry_count,
                COMPILE_DB_FILE_NAME,
                INDEXER_CONFIG_FILE_NAME,
                report.skip_rules.len()
            ),
        }
    }
}

/// Run the full pipeline for `request`
#[instrument(name = "generate", skip_all, fields(manifest = %request.manifest_path.display()))]
pub fn generate(request: &GenerateRequest) -> Result<GenerationOutcome, GeneratorError> {
    let manifest_path = &request.manifest_path;
    if !manifest_path.exists() {
        return Err(ManifestError::NotFound {
            path: manifest_path.to_string_lossy().to_string(),
        }
        .into());
    }

    let manifest_name = manifest_path
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| manifest_path.to_string_lossy().to_string());

    let gate = CacheGate::new(&request.output_dir);
    let selection = request.selection.requested();
    if request.force {
        info!("Forced regeneration requested, bypassing cache");
    } else if gate.should_skip(manifest_path, selection) {
        return Ok(GenerationOutcome::CacheHit {
            manifest_name,
            selection: selection.map(str::to_string),
        });
    }

    let fingerprint = gate
        .fingerprint(manifest_path, selection)
        .map_err(|source| GeneratorError::ManifestMetadata {
            path: manifest_path.clone(),
            source,
        })?;

    let resolved = parse_manifest(manifest_path, &request.selection)?;
    let configuration = &resolved.configuration;
    info!(
        manifest_dir = %resolved.manifest_dir.display(),
        "Resolved configuration '{}' of {}: {} defines, {} include paths, {} source files",
        configuration.name,
        resolved.manifest_path.display(),
        configuration.defines.len(),
        configuration.include_paths.len(),
        resolved.source_files.len()
    );

    let entries = build_compile_entries(&resolved.source_files, &request.output_dir);

    let writer = ConfigWriter::new(&request.output_dir);
    writer.ensure_output_dir()?;

    let skip_rules = IsolationAnalyzer::new(request.deep_isolation_root.clone())
        .compute_skip_rules(
            &request.output_dir,
            &resolved.source_files,
            &configuration.include_paths,
        );

    let artifacts = writer.write(
        &entries,
        &configuration.defines,
        &configuration.include_paths,
        &skip_rules,
        &fingerprint,
    )?;

    if let Err(e) = gitignore::ensure_ignored(&request.output_dir, &IGNORED_ARTIFACTS) {
        warn!(
            "Failed to update {} in {}: {}",
            gitignore::GITIGNORE_FILE_NAME,
            request.output_dir.display(),
            e
        );
    }

    Ok(GenerationOutcome::Generated(GenerationReport {
        manifest_name,
        configuration: configuration.name.clone(),
        entry_count: entries.len(),
        skip_rules,
        artifacts,
    }))
}
