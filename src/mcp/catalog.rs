//! Tool catalog: a fixed name -> definition map built once at startup

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;

use super::envelope::ToolCallResult;
use super::protocol::ToolDescriptor;
use super::schema::{ToolArgs, ToolSchema};
use crate::error::{GatewayError, Result};

/// Future returned by a tool handler
pub type HandlerFuture = BoxFuture<'static, Result<ToolCallResult>>;

/// Async handler bound to a tool
pub type ToolHandler = Arc<dyn Fn(ToolArgs) -> HandlerFuture + Send + Sync>;

/// A registered tool
#[derive(Clone)]
pub struct ToolDefinition {
    pub name: &'static str,
    pub description: &'static str,
    pub schema: ToolSchema,
    pub handler: ToolHandler,
}

impl ToolDefinition {
    pub fn new<F, Fut>(
        name: &'static str,
        description: &'static str,
        schema: ToolSchema,
        handler: F,
    ) -> Self
    where
        F: Fn(ToolArgs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<ToolCallResult>> + Send + 'static,
    {
        Self {
            name,
            description,
            schema,
            handler: Arc::new(move |args| handler(args).boxed()),
        }
    }

    /// Metadata for discovery
    pub fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: self.name.to_string(),
            description: self.description.to_string(),
            input_schema: self.schema.to_json_schema(),
        }
    }
}

impl std::fmt::Debug for ToolDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolDefinition")
            .field("name", &self.name)
            .field("schema", &self.schema)
            .finish_non_exhaustive()
    }
}

/// Read-only set of tools, in registration order
#[derive(Debug)]
pub struct ToolCatalog {
    tools: Vec<ToolDefinition>,
    index: HashMap<&'static str, usize>,
}

impl ToolCatalog {
    pub fn builder() -> ToolCatalogBuilder {
        ToolCatalogBuilder::default()
    }

    /// Descriptors for every tool
    pub fn list(&self) -> Vec<ToolDescriptor> {
        self.tools.iter().map(ToolDefinition::descriptor).collect()
    }

    pub fn resolve(&self, name: &str) -> Result<&ToolDefinition> {
        self.index
            .get(name)
            .map(|&i| &self.tools[i])
            .ok_or_else(|| GatewayError::UnknownTool(name.to_string()))
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

/// Collects tool definitions; `build` rejects duplicate names
#[derive(Default)]
pub struct ToolCatalogBuilder {
    tools: Vec<ToolDefinition>,
}

impl ToolCatalogBuilder {
    pub fn register(mut self, tool: ToolDefinition) -> Self {
        self.tools.push(tool);
        self
    }

    pub fn build(self) -> Result<ToolCatalog> {
        let mut index = HashMap::with_capacity(self.tools.len());
        for (i, tool) in self.tools.iter().enumerate() {
            if index.insert(tool.name, i).is_some() {
                return Err(GatewayError::DuplicateToolName(tool.name.to_string()));
            }
        }
        Ok(ToolCatalog {
            tools: self.tools,
            index,
        })
    }
}
