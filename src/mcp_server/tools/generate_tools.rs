//! clangd configuration generation tools

use rmcp::{ErrorData, model::CallToolResult};
use serde_json::json;
use tracing::{info, instrument, warn};

use super::utils::{failure_text, serialize_result, success_text};
use crate::generator::{
    self, CACHE_FILE_NAME, COMPILE_DB_FILE_NAME, CacheGate, GenerationOutcome,
    INDEXER_CONFIG_FILE_NAME,
};
use crate::project::CompilationDatabase;
use crate::project::paths::{resolve_from_cwd, to_posix};
use crate::settings::EnvDefaults;

/// Generate `compile_commands.json` and `.clangd` for one configuration of a
/// `.x2p` manifest, excluding unrelated subproject directories from clangd's
/// background index.
///
/// Generation is cached: when the manifest, the selected configuration and
/// the manifest's modification time are unchanged and both artifacts exist,
/// nothing is rewritten. The artifact names are added to the output
/// directory's `.gitignore`.
///
/// Every parameter is optional and falls back to the server's environment:
/// ADK_ACTIVE_X2P, ADK_ROOT_DIR (then the working directory) and
/// ADK_ACTIVE_CONFIG (then the manifest default).
#[derive(Debug, Default, ::serde::Deserialize, ::serde::Serialize)]
pub struct GenerateClangdConfigTool {
    /// Path to the `.x2p` manifest
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x2p_file_path: Option<String>,

    /// Directory receiving the artifacts, normally the ADK root
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<String>,

    /// Configuration name, e.g. TRAN03H
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_name: Option<String>,

    /// Regenerate even when the cache says the artifacts are current
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub force: Option<bool>,
}

impl GenerateClangdConfigTool {
    #[instrument(name = "generate_clangd_config", skip(self, defaults))]
    pub fn call_tool(&self, defaults: &EnvDefaults) -> Result<CallToolResult, ErrorData> {
        let request = match defaults.generate_request(
            self.x2p_file_path.as_deref(),
            self.output_dir.as_deref(),
            self.config_name.as_deref(),
            self.force.unwrap_or(false),
        ) {
            Ok(request) => request,
            Err(e) => return Ok(failure_text(format!("Generation failed: {e}"))),
        };

        match generator::generate(&request) {
            Ok(outcome) => {
                if let GenerationOutcome::Generated(report) = &outcome {
                    info!(
                        compile_db = %report.artifacts.compile_db.display(),
                        indexer_config = %report.artifacts.indexer_config.display(),
                        fingerprint = %report.artifacts.fingerprint.display(),
                        "Artifacts written"
                    );
                }
                info!("{}", outcome);
                Ok(success_text(outcome.to_string()))
            }
            Err(e) => {
                warn!("Generation failed: {}", e);
                Ok(failure_text(format!("Generation failed: {e}")))
            }
        }
    }
}

/// Report what a previous `generate_clangd_config` left in an output
/// directory: which artifacts exist, how many compile entries the database
/// holds and the persisted cache fingerprint.
#[derive(Debug, Default, ::serde::Deserialize, ::serde::Serialize)]
pub struct GetClangdConfigStatusTool {
    /// Directory holding the artifacts. DEFAULT: ADK_ROOT_DIR, then the
    /// working directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<String>,
}

impl GetClangdConfigStatusTool {
    #[instrument(name = "get_clangd_config_status", skip(self, defaults))]
    pub fn call_tool(&self, defaults: &EnvDefaults) -> Result<CallToolResult, ErrorData> {
        let requested = defaults.output_dir_or_default(self.output_dir.as_deref());
        let output_dir = match resolve_from_cwd(&requested) {
            Ok(output_dir) => output_dir,
            Err(e) => {
                return Ok(failure_text(format!(
                    "Status failed: cannot resolve {}: {e}",
                    requested.display()
                )));
            }
        };

        let compile_db_path = output_dir.join(COMPILE_DB_FILE_NAME);
        let compile_database = match CompilationDatabase::load(compile_db_path.clone()) {
            Ok(database) => json!({
                "path": to_posix(&database.path),
                "exists": true,
                "entry_count": database.entry_count(),
            }),
            Err(e) => json!({
                "path": to_posix(&compile_db_path),
                "exists": compile_db_path.exists(),
                "error": e.to_string(),
            }),
        };

        let indexer_config_path = output_dir.join(INDEXER_CONFIG_FILE_NAME);
        let skip_rule_count = std::fs::read_to_string(&indexer_config_path)
            .ok()
            .map(|config| count_skip_rules(&config));

        let fingerprint = match CacheGate::new(&output_dir).read_fingerprint() {
            Ok(fingerprint) => serde_json::to_value(fingerprint).unwrap_or_default(),
            Err(e) => json!({ "error": e.to_string() }),
        };

        let content = json!({
            "output_dir": to_posix(&output_dir),
            "compile_database": compile_database,
            "indexer_config": {
                "path": to_posix(&indexer_config_path),
                "exists": indexer_config_path.exists(),
                "skip_rule_count": skip_rule_count,
            },
            "fingerprint": {
                "path": to_posix(&output_dir.join(CACHE_FILE_NAME)),
                "value": fingerprint,
            },
        });

        Ok(success_text(serialize_result(&content)))
    }
}

/// Number of entries in the `Index.Background.Skip` list of a `.clangd` text
fn count_skip_rules(config: &str) -> usize {
    config
        .lines()
        .skip_while(|line| line.trim() != "Skip:")
        .skip(1)
        .take_while(|line| line.trim_start().starts_with("- "))
        .count()
}
