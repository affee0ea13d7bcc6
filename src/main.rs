mod generator;
mod io;
mod logging;
mod mcp_server;
mod project;
mod settings;

#[cfg(test)]
mod test_utils;

use clap::Parser;
use logging::{LogConfig, init_logging};
use mcp_server::X2pServerHandler;
use settings::EnvDefaults;

use rmcp::service::serve_server;
use std::path::PathBuf;
use tokio::io::{stdin, stdout};
use tracing::info;

/// CLI arguments for the x2p clangd configuration server
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Default .x2p manifest (overrides ADK_ACTIVE_X2P env var)
    #[arg(long, value_name = "FILE")]
    manifest: Option<PathBuf>,

    /// Default output directory (overrides ADK_ROOT_DIR env var)
    #[arg(long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Default configuration name (overrides ADK_ACTIVE_CONFIG env var)
    #[arg(long, value_name = "NAME")]
    config: Option<String>,

    /// Directory whose children are isolated per subproject, relative to the
    /// output directory (overrides X2P_DEEP_ISOLATION_ROOT env var)
    #[arg(long, value_name = "DIR")]
    deep_isolation_root: Option<PathBuf>,

    /// Log level (overrides RUST_LOG env var)
    #[arg(long, value_name = "LEVEL")]
    log_level: Option<String>,

    /// Log file path (overrides X2P_LOG_FILE env var)
    #[arg(long, value_name = "FILE")]
    log_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let log_config = LogConfig::from_env().with_overrides(args.log_level, args.log_file);

    if let Err(e) = init_logging(log_config) {
        eprintln!("Failed to initialize logging: {e}");
        std::process::exit(1);
    }

    let defaults = EnvDefaults::from_env().with_overrides(
        args.manifest,
        args.output_dir,
        args.config,
        args.deep_isolation_root,
    );

    info!(
        manifest = ?defaults.manifest_path,
        output_dir = ?defaults.output_dir,
        config = ?defaults.config_name,
        deep_isolation_root = %defaults.deep_isolation_root().display(),
        "Starting x2p clangd configuration server"
    );

    let handler = X2pServerHandler::new(defaults);

    // Create stdio transport
    let transport = (stdin(), stdout());

    info!("x2p MCP Server ready and listening for requests");

    let server = serve_server(handler, transport).await?;

    let quit_reason = server.waiting().await?;
    info!("Server shutdown: {:?}", quit_reason);

    Ok(())
}
