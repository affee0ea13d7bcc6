//! x2p MCP Server Handler
//!
//! Implements the rmcp 0.12 `ServerHandler` trait by hand: `list_tools`
//! advertises the four tools with their JSON schemas and `call_tool` routes by
//! name. Tool failures come back as error results; only malformed arguments
//! and unknown tool names are protocol errors.

use rmcp::{
    ErrorData,
    handler::server::ServerHandler,
    model::{
        CallToolRequestParam, CallToolResult, ListToolsResult, ServerCapabilities, ServerInfo, Tool,
    },
    service::RequestContext,
    service::RoleServer,
};
use serde::de::DeserializeOwned;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;
use tracing::Level;

use super::tools::generate_tools::{GenerateClangdConfigTool, GetClangdConfigStatusTool};
use super::tools::project_tools::{GetX2pConfigsTool, ScanAdkProjectsTool};
use crate::log_mcp_message;
use crate::log_timing;
use crate::settings::EnvDefaults;

type JsonObject = serde_json::Map<String, serde_json::Value>;

/// x2p MCP Server Handler
///
/// Stateless apart from the environment defaults captured at startup; every
/// call rereads the manifest and the output directory.
#[derive(Clone)]
pub struct X2pServerHandler {
    defaults: Arc<EnvDefaults>,
}

impl X2pServerHandler {
    pub fn new(defaults: EnvDefaults) -> Self {
        Self {
            defaults: Arc::new(defaults),
        }
    }

    fn parse_arguments<T: DeserializeOwned>(arguments: &str) -> Result<T, ErrorData> {
        serde_json::from_str(arguments).map_err(|e| {
            ErrorData::invalid_params(format!("Failed to parse arguments: {}", e), None)
        })
    }

    /// Handle scan_adk_projects tool call
    async fn handle_scan_adk_projects(
        &self,
        arguments: String,
    ) -> Result<CallToolResult, ErrorData> {
        let start = Instant::now();
        log_mcp_message!(Level::INFO, "incoming", "scan_adk_projects", &arguments);

        let params: ScanAdkProjectsTool = Self::parse_arguments(&arguments)?;
        let result = tokio::task::spawn_blocking(move || params.call_tool())
            .await
            .map_err(|e| ErrorData::internal_error(format!("Scan task failed: {}", e), None))??;

        log_mcp_message!(Level::INFO, "outgoing", "scan_adk_projects", &result);
        log_timing!(Level::DEBUG, "scan_adk_projects", start.elapsed());

        Ok(result)
    }

    /// Handle get_x2p_configs tool call
    async fn handle_get_x2p_configs(&self, arguments: String) -> Result<CallToolResult, ErrorData> {
        let start = Instant::now();
        log_mcp_message!(Level::INFO, "incoming", "get_x2p_configs", &arguments);

        let params: GetX2pConfigsTool = Self::parse_arguments(&arguments)?;
        let result = params.call_tool()?;

        log_mcp_message!(Level::INFO, "outgoing", "get_x2p_configs", &result);
        log_timing!(Level::DEBUG, "get_x2p_configs", start.elapsed());

        Ok(result)
    }

    /// Handle generate_clangd_config tool call
    async fn handle_generate_clangd_config(
        &self,
        arguments: String,
    ) -> Result<CallToolResult, ErrorData> {
        let start = Instant::now();
        log_mcp_message!(
            Level::INFO,
            "incoming",
            "generate_clangd_config",
            &arguments
        );

        let params: GenerateClangdConfigTool = Self::parse_arguments(&arguments)?;
        let defaults = Arc::clone(&self.defaults);
        let result = tokio::task::spawn_blocking(move || params.call_tool(&defaults))
            .await
            .map_err(|e| {
                ErrorData::internal_error(format!("Generation task failed: {}", e), None)
            })??;

        log_mcp_message!(Level::INFO, "outgoing", "generate_clangd_config", &result);
        log_timing!(Level::DEBUG, "generate_clangd_config", start.elapsed());

        Ok(result)
    }

    /// Handle get_clangd_config_status tool call
    async fn handle_get_clangd_config_status(
        &self,
        arguments: String,
    ) -> Result<CallToolResult, ErrorData> {
        let start = Instant::now();
        log_mcp_message!(
            Level::INFO,
            "incoming",
            "get_clangd_config_status",
            &arguments
        );

        let params: GetClangdConfigStatusTool = Self::parse_arguments(&arguments)?;
        let result = params.call_tool(&self.defaults)?;

        log_mcp_message!(Level::INFO, "outgoing", "get_clangd_config_status", &result);
        log_timing!(Level::DEBUG, "get_clangd_config_status", start.elapsed());

        Ok(result)
    }

    /// Dispatch a call by tool name
    async fn dispatch(&self, name: &str, arguments: String) -> Result<CallToolResult, ErrorData> {
        match name {
            "scan_adk_projects" => self.handle_scan_adk_projects(arguments).await,
            "get_x2p_configs" => self.handle_get_x2p_configs(arguments).await,
            "generate_clangd_config" => self.handle_generate_clangd_config(arguments).await,
            "get_clangd_config_status" => self.handle_get_clangd_config_status(arguments).await,
            _ => Err(ErrorData::invalid_params(
                format!("Unknown tool: {}", name),
                None,
            )),
        }
    }
}

/// Tool definitions advertised by `list_tools`
fn tool_definitions() -> Vec<Tool> {
    fn to_json_object(value: serde_json::Value) -> Arc<JsonObject> {
        match value {
            serde_json::Value::Object(map) => Arc::new(map),
            _ => Arc::new(JsonObject::new()),
        }
    }

    vec![
        Tool::new(
            "scan_adk_projects",
            "Recursively find every .x2p project manifest below an ADK root directory. Use it when the target project is unknown, then show the list to the user.",
            to_json_object(serde_json::json!({
                "type": "object",
                "properties": {
                    "root_dir": {
                        "type": "string",
                        "description": "ADK root directory to search."
                    }
                },
                "required": ["root_dir"]
            })),
        ),
        Tool::new(
            "get_x2p_configs",
            "List the build configurations (e.g. TRAN03H) declared by a .x2p manifest and its default configuration.",
            to_json_object(serde_json::json!({
                "type": "object",
                "properties": {
                    "x2p_file_path": {
                        "type": "string",
                        "description": "Path to the .x2p manifest."
                    }
                },
                "required": ["x2p_file_path"]
            })),
        ),
        Tool::new(
            "generate_clangd_config",
            "Generate compile_commands.json and .clangd for one configuration of a .x2p project, excluding unrelated subprojects from clangd's background index. Cached: repeated calls with an unchanged manifest and configuration do nothing.",
            to_json_object(serde_json::json!({
                "type": "object",
                "properties": {
                    "x2p_file_path": {
                        "type": "string",
                        "description": "Path to the .x2p manifest. DEFAULT: ADK_ACTIVE_X2P."
                    },
                    "output_dir": {
                        "type": "string",
                        "description": "Directory receiving the artifacts. DEFAULT: ADK_ROOT_DIR, then the server's working directory."
                    },
                    "config_name": {
                        "type": "string",
                        "description": "Configuration to activate. DEFAULT: ADK_ACTIVE_CONFIG, then the manifest default."
                    },
                    "force": {
                        "type": "boolean",
                        "description": "Regenerate even when the cache is current. DEFAULT: false."
                    }
                }
            })),
        ),
        Tool::new(
            "get_clangd_config_status",
            "Report which generated artifacts exist in an output directory, the compile entry count and the cached fingerprint.",
            to_json_object(serde_json::json!({
                "type": "object",
                "properties": {
                    "output_dir": {
                        "type": "string",
                        "description": "Directory holding the artifacts. DEFAULT: ADK_ROOT_DIR, then the server's working directory."
                    }
                }
            })),
        ),
    ]
}

impl ServerHandler for X2pServerHandler {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "x2p clangd configuration server - Generates a minimal compile_commands.json and .clangd for one configuration of an ADK firmware project. Use scan_adk_projects and get_x2p_configs to pick the project and configuration first.".into()
            ),
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .build(),
            ..Default::default()
        }
    }

    #[allow(refining_impl_trait)]
    fn list_tools(
        &self,
        _request: Option<rmcp::model::PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Pin<Box<dyn Future<Output = Result<ListToolsResult, ErrorData>> + Send + '_>> {
        let tools = tool_definitions();

        Box::pin(async move {
            Ok(ListToolsResult {
                tools,
                ..Default::default()
            })
        })
    }

    #[allow(refining_impl_trait)]
    fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Pin<Box<dyn Future<Output = Result<CallToolResult, ErrorData>> + Send + '_>> {
        let name = request.name.clone();
        // Convert Option<JsonObject> to String for JSON parsing
        let arguments = match request.arguments {
            Some(obj) => serde_json::to_string(&obj).unwrap_or_else(|_| "{}".to_string()),
            None => "{}".to_string(),
        };
        let handler = self.clone();

        Box::pin(async move { handler.dispatch(name.as_ref(), arguments).await })
    }
}
