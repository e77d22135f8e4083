//! MCP (Model Context Protocol) gateway core
//!
//! Session registry, tool catalog, dispatcher and response envelopes, plus the
//! newline-delimited JSON-RPC stdio transport.

pub mod catalog;
pub mod dispatch;
pub mod envelope;
pub mod protocol;
pub mod schema;
pub mod session;
pub mod tools;

pub use catalog::{ToolCatalog, ToolDefinition};
pub use dispatch::Dispatcher;
pub use envelope::{ToolCallResult, ToolContent};
pub use protocol::{
    methods, parse_message, Exchange, InitializeResult, McpHandler, McpRequest, McpResponse,
    McpServer, ToolDescriptor,
};
pub use schema::{ParamKind, ParamSpec, ToolArgs, ToolSchema};
pub use session::{Session, SessionId, SessionRegistry};
pub use tools::build_catalog;
