//! MCP JSON-RPC protocol implementation

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use crate::error::{GatewayError, Result};

/// MCP JSON-RPC request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpRequest {
    #[serde(default)]
    pub jsonrpc: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

impl McpRequest {
    /// Build a request with a numeric id
    pub fn new(id: i64, method: impl Into<String>, params: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id: Some(Value::from(id)),
            method: method.into(),
            params,
        }
    }

    /// Requests without an id are notifications and get no response
    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }

    pub fn is_initialize(&self) -> bool {
        self.method == methods::INITIALIZE
    }
}

/// MCP JSON-RPC response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpResponse {
    pub jsonrpc: String,
    pub id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<McpError>,
}

/// MCP error object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpError {
    pub code: i64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl McpResponse {
    /// Create a success response
    pub fn success(id: Option<Value>, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Create an error response
    pub fn error(id: Option<Value>, code: i64, message: String) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(McpError {
                code,
                message,
                data: None,
            }),
        }
    }

    /// Create error from GatewayError
    pub fn from_error(id: Option<Value>, err: GatewayError) -> Self {
        Self::error(id, err.code(), err.to_string())
    }

    /// JSON-RPC error code, if this is an error response
    pub fn error_code(&self) -> Option<i64> {
        self.error.as_ref().map(|e| e.code)
    }
}

/// Outcome of handling one inbound message
#[derive(Debug, Clone)]
pub struct Exchange {
    /// Session the message was bound to, if any
    pub session_id: Option<String>,
    /// `None` for notifications
    pub response: Option<McpResponse>,
}

impl Exchange {
    pub fn reply(session_id: Option<String>, response: McpResponse) -> Self {
        Self {
            session_id,
            response: Some(response),
        }
    }

    pub fn accepted(session_id: Option<String>) -> Self {
        Self {
            session_id,
            response: None,
        }
    }
}

/// Decode one inbound JSON-RPC message.
///
/// Bytes that are not JSON are a parse error; JSON that is not a single
/// request object (a batch, or a missing `method`) is an invalid request.
pub fn parse_message(raw: &[u8]) -> Result<McpRequest> {
    let value: Value =
        serde_json::from_slice(raw).map_err(|e| GatewayError::Parse(e.to_string()))?;
    if value.is_array() {
        return Err(GatewayError::InvalidRequest(
            "batch requests are not supported".to_string(),
        ));
    }
    serde_json::from_value(value).map_err(|e| GatewayError::InvalidRequest(e.to_string()))
}

/// Trait for handling MCP requests
#[async_trait]
pub trait McpHandler: Send + Sync {
    /// Handle one message arriving with the given session id
    async fn handle_request(&self, session_id: Option<&str>, request: McpRequest) -> Exchange;

    /// Called when the transport backing a session goes away
    fn close_session(&self, session_id: &str) -> bool;
}

/// MCP server speaking newline-delimited JSON-RPC over stdio.
///
/// A stdio connection carries exactly one session: the one opened by
/// `initialize`. It is closed when stdin reaches EOF.
pub struct McpServer<H>
where
    H: McpHandler,
{
    handler: H,
}

impl<H: McpHandler> McpServer<H> {
    /// Create a new MCP server
    pub fn new(handler: H) -> Self {
        Self { handler }
    }

    /// Run the server, reading from stdin and writing to stdout
    pub async fn run(&self) -> Result<()> {
        let stdin = BufReader::new(tokio::io::stdin());
        let mut stdout = tokio::io::stdout();
        self.serve(stdin, &mut stdout).await
    }

    /// Serve any line-oriented reader/writer pair
    pub async fn serve<R, W>(&self, reader: R, writer: &mut W) -> Result<()>
    where
        R: tokio::io::AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = reader.lines();
        let mut session_id: Option<String> = None;

        loop {
            let line = match lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => break, // EOF
                Err(e) => {
                    tracing::error!("Error reading stdin: {}", e);
                    break;
                }
            };
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            let response = match parse_message(trimmed.as_bytes()) {
                Ok(request) => {
                    let exchange = self
                        .handler
                        .handle_request(session_id.as_deref(), request)
                        .await;
                    if session_id.is_none() {
                        session_id = exchange.session_id;
                    }
                    exchange.response
                }
                Err(e) => {
                    tracing::warn!("Rejected message on stdin: {}", e);
                    Some(McpResponse::from_error(None, e))
                }
            };

            if let Some(response) = response {
                let mut response_json = serde_json::to_vec(&response)?;
                response_json.push(b'\n');
                writer.write_all(&response_json).await?;
                writer.flush().await?;
            }
        }

        if let Some(id) = session_id {
            self.handler.close_session(&id);
        }
        Ok(())
    }
}

/// Standard MCP methods
pub mod methods {
    pub const INITIALIZE: &str = "initialize";
    pub const INITIALIZED: &str = "notifications/initialized";
    pub const PING: &str = "ping";
    pub const LIST_TOOLS: &str = "tools/list";
    pub const CALL_TOOL: &str = "tools/call";
    pub const LOG_MESSAGE: &str = "notifications/message";
}

/// MCP tool descriptor as listed by `tools/list`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

/// MCP initialize result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitializeResult {
    #[serde(rename = "protocolVersion")]
    pub protocol_version: String,
    pub capabilities: ServerCapabilities,
    #[serde(rename = "serverInfo")]
    pub server_info: ServerInfo,
}

/// Server capabilities
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerCapabilities {
    pub tools: Option<ToolsCapability>,
    pub logging: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsCapability {
    #[serde(rename = "listChanged")]
    pub list_changed: bool,
}

/// Server info
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
}

/// Protocol revision this server implements
pub const PROTOCOL_VERSION: &str = "2025-03-26";

impl Default for InitializeResult {
    fn default() -> Self {
        Self {
            protocol_version: PROTOCOL_VERSION.to_string(),
            capabilities: ServerCapabilities {
                // The catalog is fixed at startup
                tools: Some(ToolsCapability {
                    list_changed: false,
                }),
                logging: Some(serde_json::json!({})),
            },
            server_info: ServerInfo {
                name: "taskgate".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
        }
    }
}
