//! Ports to the external systems the tools call
//!
//! Implementations:
//! - [`ThingsStore`]: Things3 via JavaScript for Automation (macOS)
//! - [`InMemoryTaskStore`]: fixture-backed task store
//! - [`QdrantKnowledgeBase`]: vector search over an embedded note vault
//! - [`BraveWebSearch`]: Brave Search web API
//!
//! Every failure, including timeouts, is reported as
//! [`GatewayError::CollaboratorUnavailable`](crate::error::GatewayError) so the
//! dispatcher can render it as envelope text.

mod knowledge;
mod memory;
mod things;
mod web;

pub use knowledge::QdrantKnowledgeBase;
pub use memory::{InMemoryTaskStore, TaskFixture};
pub use things::ThingsStore;
pub use web::BraveWebSearch;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{GatewayError, Result};
use crate::types::{KnowledgeHit, SafeSearch, TaskItem, WebResult};

/// Task-manager data access
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Unprocessed items in the inbox
    async fn fetch_inbox(&self) -> Result<Vec<TaskItem>>;

    /// Items scheduled for today
    async fn fetch_today(&self) -> Result<Vec<TaskItem>>;

    /// Names of all tags
    async fn list_tags(&self) -> Result<Vec<String>>;

    /// Names of all projects
    async fn list_projects(&self) -> Result<Vec<String>>;

    /// Items belonging to the named project
    async fn list_project_items(&self, project: &str) -> Result<Vec<TaskItem>>;

    /// Replace the named fields of an existing item.
    ///
    /// Optional fields that are `None` are cleared, not left untouched.
    async fn update_item(&self, item: &TaskItem) -> Result<()>;
}

/// Similarity search over the knowledge base
#[async_trait]
pub trait KnowledgeBase: Send + Sync {
    /// Ranked hits, best first
    async fn search(
        &self,
        query: &str,
        limit: usize,
        tags: Option<&[String]>,
    ) -> Result<Vec<KnowledgeHit>>;
}

/// Web search provider
#[async_trait]
pub trait WebSearch: Send + Sync {
    async fn search(&self, query: &str, limit: usize, safety: SafeSearch)
        -> Result<Vec<WebResult>>;
}

/// The collaborators a catalog is bound to
#[derive(Clone)]
pub struct Collaborators {
    pub tasks: Arc<dyn TaskStore>,
    pub knowledge: Arc<dyn KnowledgeBase>,
    pub web: Arc<dyn WebSearch>,
}

/// Run a collaborator future under a bounded wait
pub(crate) async fn with_timeout<T>(
    what: &str,
    limit: Duration,
    fut: impl std::future::Future<Output = Result<T>>,
) -> Result<T> {
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(GatewayError::CollaboratorUnavailable(format!(
            "{} timed out after {:?}",
            what, limit
        ))),
    }
}

/// Build a shared HTTP client with a request timeout
pub(crate) fn http_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("taskgate/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| GatewayError::Config(format!("Failed to build HTTP client: {}", e)))
}

/// Normalize transport errors from HTTP collaborators
pub(crate) fn unavailable(service: &str, err: reqwest::Error) -> GatewayError {
    if err.is_timeout() {
        GatewayError::CollaboratorUnavailable(format!("{} request timed out", service))
    } else {
        GatewayError::CollaboratorUnavailable(format!("{} request failed: {}", service, err))
    }
}
