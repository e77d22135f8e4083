//! Runtime configuration for the gateway and its collaborators

use std::net::SocketAddr;
use std::time::Duration;

use crate::error::{GatewayError, Result};

/// Default number of items the today tool returns
pub const DEFAULT_TODAY_CAP: usize = 50;

/// Headroom the HTTP request timeout keeps over the tool timeout, so a slow
/// tool is answered with an error envelope rather than a bare 408
pub const REQUEST_TIMEOUT_MARGIN: Duration = Duration::from_secs(5);

/// Gateway and transport settings
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the HTTP transport binds to
    pub bind: SocketAddr,
    /// Maximum items returned by the today tool
    pub today_cap: usize,
    /// Backstop for a single tool call, collaborators included
    pub tool_timeout: Duration,
    /// Per-request timeout enforced by the HTTP layer
    pub request_timeout: Duration,
    /// Maximum accepted request body size
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 3000)),
            today_cap: DEFAULT_TODAY_CAP,
            tool_timeout: Duration::from_secs(30),
            request_timeout: Duration::from_secs(30) + REQUEST_TIMEOUT_MARGIN,
            max_body_bytes: 10 * 1024 * 1024,
        }
    }
}

impl ServerConfig {
    /// Reject settings the gateway cannot honour
    pub fn validate(&self) -> Result<()> {
        if self.today_cap == 0 {
            return Err(GatewayError::Config("today cap must be at least 1".into()));
        }
        if self.tool_timeout.is_zero() {
            return Err(GatewayError::Config("tool timeout must be non-zero".into()));
        }
        if self.request_timeout <= self.tool_timeout {
            return Err(GatewayError::Config(format!(
                "request timeout ({:?}) must exceed tool timeout ({:?})",
                self.request_timeout, self.tool_timeout
            )));
        }
        Ok(())
    }
}

/// Things3 automation settings
#[derive(Debug, Clone)]
pub struct ThingsConfig {
    /// Interpreter used to run JavaScript for Automation
    pub osascript_path: String,
    /// Bounded wait for a single script
    pub script_timeout: Duration,
}

impl Default for ThingsConfig {
    fn default() -> Self {
        Self {
            osascript_path: "osascript".to_string(),
            script_timeout: Duration::from_secs(10),
        }
    }
}

/// Vector knowledge base settings (Qdrant + OpenAI-compatible embeddings)
#[derive(Debug, Clone)]
pub struct KnowledgeBaseConfig {
    pub qdrant_url: String,
    pub qdrant_api_key: Option<String>,
    pub collection: String,
    /// Base URL of the embeddings API, e.g. LM Studio's `/v1`
    pub embedding_base_url: String,
    pub embedding_api_key: String,
    pub embedding_model: String,
    pub timeout: Duration,
}

impl Default for KnowledgeBaseConfig {
    fn default() -> Self {
        Self {
            qdrant_url: "http://localhost:6333".to_string(),
            qdrant_api_key: None,
            collection: "rag_docs".to_string(),
            embedding_base_url: "http://localhost:1234/v1".to_string(),
            embedding_api_key: "lm-studio".to_string(),
            embedding_model: "bge-base-en-v1.5".to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Web search settings (Brave Search API)
#[derive(Debug, Clone)]
pub struct WebSearchConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
}

impl Default for WebSearchConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.search.brave.com/res/v1".to_string(),
            api_key: None,
            timeout: Duration::from_secs(30),
        }
    }
}
