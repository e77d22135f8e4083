//! MCP tool definitions for taskgate

use serde::Deserialize;
use serde_json::json;

use super::catalog::{ToolCatalog, ToolDefinition};
use super::envelope::{self, ToolCallResult};
use super::schema::{ParamKind, ParamSpec, ToolSchema};
use crate::collaborators::Collaborators;
use crate::error::{GatewayError, Result};
use crate::types::{clamp_web_limit, SafeSearch, TaskItem, TaskStatus};

pub const GET_INBOX: &str = "get_things3_inbox";
pub const GET_TODAY: &str = "get_things3_today";
pub const GET_TAGS: &str = "get_things3_tags";
pub const GET_PROJECTS: &str = "get_things3_projects";
pub const GET_PROJECT_TODOS: &str = "get_things3_todos_by_project";
pub const UPDATE_TODO: &str = "update_things3_todo";
pub const SEARCH_KNOWLEDGE_BASE: &str = "search_knowledge_base";
pub const SEARCH_WEB: &str = "search_web";

/// Build the full catalog bound to the given collaborators
pub fn build_catalog(collaborators: &Collaborators, today_cap: usize) -> Result<ToolCatalog> {
    ToolCatalog::builder()
        .register(get_inbox(collaborators))
        .register(get_today(collaborators, today_cap))
        .register(get_tags(collaborators))
        .register(get_projects(collaborators))
        .register(get_project_todos(collaborators))
        .register(update_todo(collaborators))
        .register(search_knowledge_base(collaborators))
        .register(search_web(collaborators))
        .build()
}

pub fn get_inbox(c: &Collaborators) -> ToolDefinition {
    let tasks = c.tasks.clone();
    ToolDefinition::new(
        GET_INBOX,
        "Retrieves all items from the Things3 inbox, this inbox are items that have not yet been processed",
        ToolSchema::empty(),
        move |_args| {
            let tasks = tasks.clone();
            async move {
                Ok(match tasks.fetch_inbox().await {
                    Ok(items) => ToolCallResult::text(envelope::inbox_listing(&items)),
                    Err(e) => envelope::failure("retrieving Things3 inbox data", &e),
                })
            }
        },
    )
}

pub fn get_today(c: &Collaborators, cap: usize) -> ToolDefinition {
    let tasks = c.tasks.clone();
    ToolDefinition::new(
        GET_TODAY,
        "Retrieves all items from the Things3 today list",
        ToolSchema::empty(),
        move |_args| {
            let tasks = tasks.clone();
            async move {
                Ok(match tasks.fetch_today().await {
                    Ok(items) => {
                        let text = envelope::today_listing(&items, cap);
                        tracing::debug!("Today response text length: {} characters", text.len());
                        ToolCallResult::text(text)
                    }
                    Err(e) => envelope::failure("retrieving Things3 today data", &e),
                })
            }
        },
    )
}

pub fn get_tags(c: &Collaborators) -> ToolDefinition {
    let tasks = c.tasks.clone();
    ToolDefinition::new(
        GET_TAGS,
        "Retrieves all available tags from Things3",
        ToolSchema::empty(),
        move |_args| {
            let tasks = tasks.clone();
            async move {
                Ok(match tasks.list_tags().await {
                    Ok(tags) => {
                        ToolCallResult::text(envelope::bullet_list("Available Things3 tags:", &tags))
                    }
                    Err(e) => envelope::failure("retrieving Things3 tags", &e),
                })
            }
        },
    )
}

pub fn get_projects(c: &Collaborators) -> ToolDefinition {
    let tasks = c.tasks.clone();
    ToolDefinition::new(
        GET_PROJECTS,
        "Retrieves all available projects from Things3",
        ToolSchema::empty(),
        move |_args| {
            let tasks = tasks.clone();
            async move {
                Ok(match tasks.list_projects().await {
                    Ok(projects) => ToolCallResult::text(envelope::bullet_list(
                        "Available Things3 projects:",
                        &projects,
                    )),
                    Err(e) => envelope::failure("retrieving Things3 projects", &e),
                })
            }
        },
    )
}

pub fn get_project_todos(c: &Collaborators) -> ToolDefinition {
    let tasks = c.tasks.clone();
    ToolDefinition::new(
        GET_PROJECT_TODOS,
        "Retrieves all todos for a specific project from Things3",
        ToolSchema::new(vec![ParamSpec::required(
            "project",
            ParamKind::String,
            "The name of the project to retrieve todos for",
        )]),
        move |args| {
            let tasks = tasks.clone();
            async move {
                let project = args.str("project").unwrap_or_default().to_string();
                Ok(match tasks.list_project_items(&project).await {
                    Ok(items) => ToolCallResult::text(envelope::project_listing(&project, &items)),
                    Err(e) => envelope::failure(
                        &format!("retrieving Things3 todos for project \"{}\"", project),
                        &e,
                    ),
                })
            }
        },
    )
}

/// Arguments of the update tool, after validation
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateTodoArgs {
    id: String,
    name: String,
    status: TaskStatus,
    notes: Option<String>,
    tags: Vec<String>,
    project: Option<String>,
    due_date: Option<String>,
}

impl From<UpdateTodoArgs> for TaskItem {
    fn from(args: UpdateTodoArgs) -> Self {
        TaskItem {
            id: args.id,
            name: args.name,
            status: args.status,
            notes: args.notes,
            tags: args.tags.into_iter().collect(),
            project: args.project,
            due_date: args.due_date,
        }
    }
}

pub fn update_todo(c: &Collaborators) -> ToolDefinition {
    let tasks = c.tasks.clone();
    ToolDefinition::new(
        UPDATE_TODO,
        "Updates a todo item in Things3. Optional fields that are omitted are cleared.",
        ToolSchema::new(vec![
            ParamSpec::required("id", ParamKind::String, "The ID of the todo item to update"),
            ParamSpec::required("name", ParamKind::String, "The name/title of the todo item"),
            ParamSpec::optional(
                "status",
                ParamKind::Enum(TaskStatus::ALL),
                "The status of the todo item",
            )
            .with_default(json!("open")),
            ParamSpec::optional("notes", ParamKind::String, "Optional notes for the todo item"),
            ParamSpec::required(
                "tags",
                ParamKind::StringArray,
                "Array of tag names for the todo item",
            ),
            ParamSpec::optional(
                "project",
                ParamKind::String,
                "Optional project name for the todo item",
            ),
            ParamSpec::optional(
                "dueDate",
                ParamKind::String,
                "Optional due date for the todo item",
            ),
        ]),
        move |args| {
            let tasks = tasks.clone();
            async move {
                let item: TaskItem = args
                    .parse::<UpdateTodoArgs>()
                    .map_err(|e| GatewayError::SchemaValidation(e.to_string()))?
                    .into();
                Ok(match tasks.update_item(&item).await {
                    Ok(()) => ToolCallResult::text(format!(
                        "Successfully updated Things3 todo item: {}",
                        item.name
                    )),
                    Err(e) => envelope::failure("updating Things3 todo", &e),
                })
            }
        },
    )
}

pub fn search_knowledge_base(c: &Collaborators) -> ToolDefinition {
    let knowledge = c.knowledge.clone();
    ToolDefinition::new(
        SEARCH_KNOWLEDGE_BASE,
        "Semantic search over the personal knowledge base (markdown notes). Returns the best matching chunks with their source files.",
        ToolSchema::new(vec![
            ParamSpec::required("query", ParamKind::String, "What to search for"),
            ParamSpec::optional(
                "limit",
                ParamKind::Integer {
                    min: Some(1),
                    max: Some(50),
                },
                "Maximum number of chunks to return",
            )
            .with_default(json!(5)),
            ParamSpec::optional(
                "tags",
                ParamKind::StringArray,
                "Only return chunks carrying any of these tags",
            ),
        ]),
        move |args| {
            let knowledge = knowledge.clone();
            async move {
                let query = args.str("query").unwrap_or_default().to_string();
                let limit = args.integer("limit").unwrap_or(5).max(1) as usize;
                let tags = args.strings("tags");
                Ok(match knowledge.search(&query, limit, tags.as_deref()).await {
                    Ok(hits) => ToolCallResult::text(envelope::knowledge_hits(&query, &hits)),
                    Err(e) => envelope::failure("searching the knowledge base", &e),
                })
            }
        },
    )
}

pub fn search_web(c: &Collaborators) -> ToolDefinition {
    let web = c.web.clone();
    ToolDefinition::new(
        SEARCH_WEB,
        "Searches the web and returns titles, URLs and descriptions (at most 10 results)",
        ToolSchema::new(vec![
            ParamSpec::required("query", ParamKind::String, "Search query"),
            ParamSpec::optional(
                "limit",
                ParamKind::Integer {
                    min: Some(1),
                    max: None,
                },
                "Number of results; values above 10 are clamped",
            )
            .with_default(json!(5)),
            ParamSpec::optional(
                "safety",
                ParamKind::Enum(SafeSearch::ALL),
                "Safe-search level",
            )
            .with_default(json!("moderate")),
        ]),
        move |args| {
            let web = web.clone();
            async move {
                let query = args.str("query").unwrap_or_default().to_string();
                let limit = clamp_web_limit(args.integer("limit").unwrap_or(5));
                let safety: SafeSearch = args
                    .str("safety")
                    .unwrap_or("moderate")
                    .parse()
                    .map_err(GatewayError::SchemaValidation)?;
                Ok(match web.search(&query, limit, safety).await {
                    Ok(mut results) => {
                        results.truncate(limit);
                        ToolCallResult::text(envelope::web_results(&query, &results))
                    }
                    Err(e) => envelope::failure("searching the web", &e),
                })
            }
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::{InMemoryTaskStore, KnowledgeBase, TaskFixture, WebSearch};
    use crate::types::{KnowledgeHit, WebResult};
    use async_trait::async_trait;
    use std::sync::Arc;

    struct NoKnowledge;

    #[async_trait]
    impl KnowledgeBase for NoKnowledge {
        async fn search(&self, _: &str, _: usize, _: Option<&[String]>) -> Result<Vec<KnowledgeHit>> {
            Ok(vec![])
        }
    }

    struct NoWeb;

    #[async_trait]
    impl WebSearch for NoWeb {
        async fn search(&self, _: &str, _: usize, _: SafeSearch) -> Result<Vec<WebResult>> {
            Ok(vec![])
        }
    }

    fn collaborators() -> Collaborators {
        Collaborators {
            tasks: Arc::new(InMemoryTaskStore::from_fixture(TaskFixture {
                projects: vec!["Groceries".into()],
                ..TaskFixture::default()
            })),
            knowledge: Arc::new(NoKnowledge),
            web: Arc::new(NoWeb),
        }
    }

    #[test]
    fn test_catalog_has_every_tool() {
        let catalog = build_catalog(&collaborators(), 50).unwrap();
        let names: Vec<String> = catalog.list().into_iter().map(|d| d.name).collect();
        assert_eq!(
            names,
            vec![
                GET_INBOX,
                GET_TODAY,
                GET_TAGS,
                GET_PROJECTS,
                GET_PROJECT_TODOS,
                UPDATE_TODO,
                SEARCH_KNOWLEDGE_BASE,
                SEARCH_WEB
            ]
        );
    }

    #[test]
    fn test_update_schema_requires_identity_and_tags() {
        let tool = update_todo(&collaborators());
        let schema = tool.schema.to_json_schema();
        assert_eq!(schema["required"], json!(["id", "name", "tags"]));
        assert_eq!(schema["properties"]["status"]["default"], "open");
    }

    #[tokio::test]
    async fn test_update_unknown_item_is_envelope_text() {
        let tool = update_todo(&collaborators());
        let args = tool
            .schema
            .validate(&json!({"id": "nope", "name": "Ghost", "tags": []}))
            .unwrap();
        let result = (tool.handler)(args).await.unwrap();
        assert!(result.is_error());
        assert_eq!(
            result.joined_text(),
            "Error updating Things3 todo: Todo item not found: nope"
        );
    }

    #[tokio::test]
    async fn test_empty_web_results() {
        let tool = search_web(&collaborators());
        let args = tool.schema.validate(&json!({"query": "rust"})).unwrap();
        let result = (tool.handler)(args).await.unwrap();
        assert_eq!(result.joined_text(), "No web results for \"rust\"");
    }
}
