//! Streamable HTTP transport
//!
//! `POST /mcp` carries JSON-RPC messages, `GET /mcp` opens the session's
//! server-push stream and `DELETE /mcp` ends the session. The session is named
//! by the `Mcp-Session-Id` header.

mod server;

pub use server::{router, AppState, McpHttpServer, MCP_SESSION_ID_HEADER};
