//! Caller parameters and their environment fallbacks
//!
//! The environment is read exactly once at startup into [`EnvDefaults`];
//! tool calls then resolve their optional arguments against that snapshot.
//! Nothing below this module looks at the process environment.

use std::env;
use std::path::{Path, PathBuf};

use crate::generator::{DEFAULT_DEEP_ISOLATION_ROOT, GenerateRequest, GeneratorError};
use crate::project::ConfigSelection;
use crate::project::paths::resolve_from_cwd;

/// Manifest used when a call does not name one
pub const MANIFEST_ENV: &str = "ADK_ACTIVE_X2P";
/// Output directory used when a call does not name one
pub const OUTPUT_DIR_ENV: &str = "ADK_ROOT_DIR";
/// Configuration used when a call does not name one
pub const CONFIG_ENV: &str = "ADK_ACTIVE_CONFIG";
/// Override for the deep isolation root; an empty value keeps the default
pub const DEEP_ISOLATION_ROOT_ENV: &str = "X2P_DEEP_ISOLATION_ROOT";

/// Output directory when neither the call nor the environment gives one
const FALLBACK_OUTPUT_DIR: &str = ".";

/// Snapshot of the server-wide parameter defaults
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvDefaults {
    pub manifest_path: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub config_name: Option<String>,
    pub deep_isolation_root: Option<PathBuf>,
}

impl EnvDefaults {
    /// Read defaults from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Read defaults through `lookup`; empty values count as unset
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let read = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        Self {
            manifest_path: read(MANIFEST_ENV).map(PathBuf::from),
            output_dir: read(OUTPUT_DIR_ENV).map(PathBuf::from),
            config_name: read(CONFIG_ENV),
            deep_isolation_root: read(DEEP_ISOLATION_ROOT_ENV).map(PathBuf::from),
        }
    }

    /// Override values from CLI arguments
    pub fn with_overrides(
        mut self,
        manifest_path: Option<PathBuf>,
        output_dir: Option<PathBuf>,
        config_name: Option<String>,
        deep_isolation_root: Option<PathBuf>,
    ) -> Self {
        if let Some(manifest_path) = manifest_path {
            self.manifest_path = Some(manifest_path);
        }
        if let Some(output_dir) = output_dir {
            self.output_dir = Some(output_dir);
        }
        if let Some(config_name) = config_name.filter(|name| !name.is_empty()) {
            self.config_name = Some(config_name);
        }
        if let Some(deep_isolation_root) = deep_isolation_root {
            self.deep_isolation_root = Some(deep_isolation_root);
        }
        self
    }

    /// Deep isolation root relative to the output directory
    pub fn deep_isolation_root(&self) -> PathBuf {
        self.deep_isolation_root
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DEEP_ISOLATION_ROOT))
    }

    /// Output directory for a call, before resolution
    pub fn output_dir_or_default(&self, requested: Option<&str>) -> PathBuf {
        non_empty(requested)
            .map(PathBuf::from)
            .or_else(|| self.output_dir.clone())
            .unwrap_or_else(|| PathBuf::from(FALLBACK_OUTPUT_DIR))
    }

    /// Build a generation request from optional call arguments
    pub fn generate_request(
        &self,
        manifest_path: Option<&str>,
        output_dir: Option<&str>,
        config_name: Option<&str>,
        force: bool,
    ) -> Result<GenerateRequest, GeneratorError> {
        let manifest_path = non_empty(manifest_path)
            .map(PathBuf::from)
            .or_else(|| self.manifest_path.clone())
            .ok_or(GeneratorError::ManifestPathNotProvided)?;
        let output_dir = self.output_dir_or_default(output_dir);

        Ok(GenerateRequest {
            manifest_path: resolve(&manifest_path)?,
            output_dir: resolve(&output_dir)?,
            selection: ConfigSelection::new(
                config_name.map(str::to_string),
                self.config_name.clone(),
            ),
            deep_isolation_root: Some(self.deep_isolation_root()),
            force,
        })
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|value| !value.trim().is_empty())
}

fn resolve(path: &Path) -> Result<PathBuf, GeneratorError> {
    resolve_from_cwd(path).map_err(GeneratorError::WorkingDirectory)
}
