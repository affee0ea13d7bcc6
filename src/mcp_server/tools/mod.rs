//! Tools available through the MCP server

pub mod generate_tools;
pub mod project_tools;
pub mod utils;
