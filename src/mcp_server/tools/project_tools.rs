//! Manifest discovery and inspection tools

use std::path::PathBuf;

use rmcp::{ErrorData, model::CallToolResult};
use tracing::{info, instrument};

use super::utils::{failure_text, success_text};
use crate::project::manifest::ProjectManifest;
use crate::project::paths::{resolve_from_cwd, to_posix};
use crate::project::{ManifestError, ManifestScanner, ProjectError};

/// List every `.x2p` project manifest below an ADK root directory.
///
/// Intended for agents that do not yet know which project to target: show the
/// list to the user, then pass the chosen path to `get_x2p_configs` or
/// `generate_clangd_config`. Directories named `.git`, `build` and `depend_`
/// are not searched.
#[derive(Debug, ::serde::Deserialize, ::serde::Serialize)]
pub struct ScanAdkProjectsTool {
    /// ADK root directory to search (absolute, or relative to the server's
    /// working directory)
    pub root_dir: String,
}

impl ScanAdkProjectsTool {
    #[instrument(name = "scan_adk_projects", skip(self))]
    pub fn call_tool(&self) -> Result<CallToolResult, ErrorData> {
        let root = match resolve_from_cwd(&PathBuf::from(&self.root_dir)) {
            Ok(root) => root,
            Err(e) => {
                return Ok(failure_text(format!(
                    "Scan failed: cannot resolve {}: {e}",
                    self.root_dir
                )));
            }
        };

        let manifests = match ManifestScanner::default().scan(&root) {
            Ok(manifests) => manifests,
            Err(ProjectError::PathNotFound { path }) => {
                return Ok(failure_text(format!(
                    "Scan failed: root directory does not exist -> {path}"
                )));
            }
            Err(e) => return Ok(failure_text(format!("Scan failed: {e}"))),
        };

        info!(
            "Found {} manifests under {}",
            manifests.len(),
            root.display()
        );

        if manifests.is_empty() {
            return Ok(success_text("Scan complete: no .x2p files found."));
        }

        let mut message = String::from("Found the following .x2p project files:\n");
        for (index, manifest) in manifests.iter().enumerate() {
            message.push_str(&format!("{}. {}\n", index + 1, to_posix(manifest)));
        }
        Ok(success_text(message))
    }
}

/// List the build configurations a `.x2p` manifest declares and its default.
///
/// Use it to ask the user which configuration (e.g. TRAN03H) to activate
/// before calling `generate_clangd_config`.
#[derive(Debug, ::serde::Deserialize, ::serde::Serialize)]
pub struct GetX2pConfigsTool {
    /// Path to the `.x2p` manifest
    pub x2p_file_path: String,
}

impl GetX2pConfigsTool {
    #[instrument(name = "get_x2p_configs", skip(self))]
    pub fn call_tool(&self) -> Result<CallToolResult, ErrorData> {
        let path = match resolve_from_cwd(&PathBuf::from(&self.x2p_file_path)) {
            Ok(path) => path,
            Err(e) => {
                return Ok(failure_text(format!(
                    "Read failed: cannot resolve {}: {e}",
                    self.x2p_file_path
                )));
            }
        };

        let manifest = match ProjectManifest::load(&path) {
            Ok(manifest) => manifest,
            Err(ManifestError::NotFound { path }) => {
                return Ok(failure_text(format!("Read failed: file not found -> {path}")));
            }
            Err(e) => return Ok(failure_text(format!("Parse failed: {e}"))),
        };

        let manifest_name = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| self.x2p_file_path.clone());

        let mut message = format!("Available configurations of project [{manifest_name}]:\n");
        message.push_str(&format!(
            "Default configuration: {}\n\nAll configurations:\n",
            manifest
                .default_configuration
                .as_deref()
                .unwrap_or("not specified")
        ));
        for (index, name) in manifest.configuration_names().iter().enumerate() {
            message.push_str(&format!("{}. {}\n", index + 1, name));
        }

        info!(
            "Listed {} configurations of {}",
            manifest.configurations.len(),
            path.display()
        );
        Ok(success_text(message))
    }
}
