//! Error types for taskgate

use thiserror::Error;

/// Result type alias for taskgate operations
pub type Result<T> = std::result::Result<T, GatewayError>;

/// JSON-RPC error codes used on the wire
pub mod codes {
    pub const PARSE_ERROR: i64 = -32700;
    pub const INVALID_REQUEST: i64 = -32600;
    pub const METHOD_NOT_FOUND: i64 = -32601;
    pub const INVALID_PARAMS: i64 = -32602;
    pub const INTERNAL_ERROR: i64 = -32603;
    /// Missing, unknown or closed session id
    pub const INVALID_SESSION: i64 = -32000;
}

/// Main error type for taskgate
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Bad Request: No valid session ID provided")]
    InvalidSession(Option<String>),

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Invalid params: {0}")]
    InvalidParams(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid arguments: {0}")]
    SchemaValidation(String),

    #[error("{0}")]
    CollaboratorUnavailable(String),

    #[error("Todo item not found: {0}")]
    TaskNotFound(String),

    #[error("Duplicate tool name in catalog: {0}")]
    DuplicateToolName(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),
}

impl GatewayError {
    /// Get error code for MCP protocol
    pub fn code(&self) -> i64 {
        match self {
            GatewayError::InvalidSession(_) => codes::INVALID_SESSION,
            GatewayError::UnknownTool(_) => codes::METHOD_NOT_FOUND,
            GatewayError::InvalidParams(_) | GatewayError::SchemaValidation(_) => {
                codes::INVALID_PARAMS
            }
            GatewayError::InvalidRequest(_) => codes::INVALID_REQUEST,
            GatewayError::Parse(_) | GatewayError::Serialization(_) => codes::PARSE_ERROR,
            _ => codes::INTERNAL_ERROR,
        }
    }
}
