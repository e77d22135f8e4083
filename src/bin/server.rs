//! taskgate MCP server
//!
//! Run with: taskgate-server [--transport stdio|http]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use taskgate::collaborators::{
    BraveWebSearch, Collaborators, InMemoryTaskStore, QdrantKnowledgeBase, TaskStore, ThingsStore,
};
use taskgate::config::{
    KnowledgeBaseConfig, ServerConfig, ThingsConfig, WebSearchConfig, REQUEST_TIMEOUT_MARGIN,
};
use taskgate::error::Result;
use taskgate::http::McpHttpServer;
use taskgate::mcp::{build_catalog, Dispatcher, McpServer, SessionRegistry};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Transport {
    /// Streamable HTTP on /mcp
    Http,
    /// Newline-delimited JSON-RPC on stdin/stdout
    Stdio,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum TaskBackend {
    /// Things3 via osascript (macOS)
    Things,
    /// In-memory store seeded from --fixture
    Memory,
}

#[derive(Parser, Debug)]
#[command(name = "taskgate-server")]
#[command(about = "MCP gateway for Things3, a knowledge base and web search")]
#[command(version)]
struct Args {
    /// Transport to serve
    #[arg(long, env = "TASKGATE_TRANSPORT", value_enum, default_value = "http")]
    transport: Transport,

    /// Host to bind the HTTP transport to
    #[arg(long, env = "TASKGATE_HOST", default_value = "127.0.0.1")]
    host: std::net::IpAddr,

    /// Port for the HTTP transport
    #[arg(long, env = "PORT", default_value = "3000")]
    port: u16,

    /// Task store backend
    #[arg(long, env = "TASKGATE_TASK_BACKEND", value_enum, default_value = "things")]
    task_backend: TaskBackend,

    /// JSON fixture for the memory backend
    #[arg(long, env = "TASKGATE_FIXTURE")]
    fixture: Option<String>,

    /// Maximum items returned by the today tool
    #[arg(long, env = "TASKGATE_TODAY_CAP", default_value = "50")]
    today_cap: usize,

    /// Backstop for a single tool call, in seconds
    #[arg(long, env = "TASKGATE_TOOL_TIMEOUT", default_value = "30")]
    tool_timeout_secs: u64,

    /// osascript timeout, in seconds
    #[arg(long, env = "TASKGATE_SCRIPT_TIMEOUT", default_value = "10")]
    script_timeout_secs: u64,

    /// Qdrant base URL
    #[arg(long, env = "QDRANT_URL", default_value = "http://localhost:6333")]
    qdrant_url: String,

    /// Qdrant API key
    #[arg(long, env = "QDRANT_API_KEY")]
    qdrant_api_key: Option<String>,

    /// Qdrant collection holding the indexed notes
    #[arg(long, env = "QDRANT_COLLECTION", default_value = "rag_docs")]
    qdrant_collection: String,

    /// OpenAI-compatible embeddings endpoint
    #[arg(long, env = "LMSTUDIO_BASEURL", default_value = "http://localhost:1234/v1")]
    embedding_base_url: String,

    /// Embeddings API key
    #[arg(long, env = "LMSTUDIO_API_KEY", default_value = "lm-studio")]
    embedding_api_key: String,

    /// Embedding model name
    #[arg(long, env = "EMBEDDING_MODEL", default_value = "bge-base-en-v1.5")]
    embedding_model: String,

    /// Brave Search API key (web search is disabled without it)
    #[arg(long, env = "BRAVE_API_KEY")]
    brave_api_key: Option<String>,

    /// Emit logs as JSON
    #[arg(long, env = "TASKGATE_LOG_JSON")]
    log_json: bool,
}

fn init_tracing(json: bool) {
    // Logs go to stderr; stdout carries the stdio transport
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_ansi(false),
            )
            .init();
    }
}

fn task_store(args: &Args) -> Result<Arc<dyn TaskStore>> {
    match args.task_backend {
        TaskBackend::Things => Ok(Arc::new(ThingsStore::new(ThingsConfig {
            script_timeout: Duration::from_secs(args.script_timeout_secs),
            ..ThingsConfig::default()
        }))),
        TaskBackend::Memory => match &args.fixture {
            Some(path) => Ok(Arc::new(InMemoryTaskStore::load(path)?)),
            None => {
                tracing::warn!("No --fixture given; the memory task store starts empty");
                Ok(Arc::new(InMemoryTaskStore::new()))
            }
        },
    }
}

fn collaborators(args: &Args) -> Result<Collaborators> {
    let knowledge = QdrantKnowledgeBase::new(KnowledgeBaseConfig {
        qdrant_url: args.qdrant_url.clone(),
        qdrant_api_key: args.qdrant_api_key.clone(),
        collection: args.qdrant_collection.clone(),
        embedding_base_url: args.embedding_base_url.clone(),
        embedding_api_key: args.embedding_api_key.clone(),
        embedding_model: args.embedding_model.clone(),
        ..KnowledgeBaseConfig::default()
    })?;

    if args.brave_api_key.is_none() {
        tracing::warn!("BRAVE_API_KEY is not set; search_web will report an error");
    }
    let web = BraveWebSearch::new(WebSearchConfig {
        api_key: args.brave_api_key.clone(),
        ..WebSearchConfig::default()
    })?;

    Ok(Collaborators {
        tasks: task_store(args)?,
        knowledge: Arc::new(knowledge),
        web: Arc::new(web),
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.log_json);

    let tool_timeout = Duration::from_secs(args.tool_timeout_secs);
    let config = ServerConfig {
        bind: SocketAddr::new(args.host, args.port),
        today_cap: args.today_cap,
        tool_timeout,
        request_timeout: tool_timeout + REQUEST_TIMEOUT_MARGIN,
        ..ServerConfig::default()
    };
    config.validate()?;

    let catalog = build_catalog(&collaborators(&args)?, config.today_cap)?;
    tracing::info!("Registered {} tools", catalog.len());

    let dispatcher = Dispatcher::new(Arc::new(SessionRegistry::new()), Arc::new(catalog))
        .with_tool_timeout(config.tool_timeout);

    match args.transport {
        Transport::Stdio => {
            tracing::info!("taskgate MCP server starting on stdio...");
            McpServer::new(dispatcher).run().await?;
        }
        Transport::Http => {
            McpHttpServer::new(dispatcher, config).start().await?;
        }
    }

    Ok(())
}
