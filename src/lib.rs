//! taskgate - MCP tool gateway
//!
//! Exposes Things3 task data, a personal knowledge base and web search to AI
//! agents through the Model Context Protocol, over stdio or streamable HTTP.

pub mod collaborators;
pub mod config;
pub mod error;
pub mod http;
pub mod mcp;
pub mod types;

pub use error::{GatewayError, Result};
pub use types::*;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
