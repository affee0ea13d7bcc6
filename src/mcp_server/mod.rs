//! MCP server exposing the x2p clangd configuration tools over stdio

pub mod server;
pub mod tools;

pub use server::X2pServerHandler;
