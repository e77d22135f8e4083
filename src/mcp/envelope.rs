//! Tool response envelopes and their text rendering
//!
//! Every tool call yields exactly one [`ToolCallResult`]. Failures are
//! rendered as text too, so an agent always gets something it can show.

use serde::{Deserialize, Serialize};

use crate::types::{KnowledgeHit, TaskItem, WebResult};

/// Tool call result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallResult {
    pub content: Vec<ToolContent>,
    #[serde(rename = "isError", skip_serializing_if = "Option::is_none")]
    pub is_error: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ToolContent {
    #[serde(rename = "text")]
    Text { text: String },
}

impl ToolCallResult {
    /// Create a text result
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent::Text { text: text.into() }],
            is_error: None,
        }
    }

    /// Create an error result
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent::Text {
                text: message.into(),
            }],
            is_error: Some(true),
        }
    }

    pub fn is_error(&self) -> bool {
        self.is_error.unwrap_or(false)
    }

    /// All text blocks joined by newlines
    pub fn joined_text(&self) -> String {
        self.content
            .iter()
            .map(|block| match block {
                ToolContent::Text { text } => text.as_str(),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Error envelope for a failed operation, e.g.
/// `failure("retrieving Things3 tags", &err)`
pub fn failure(action: &str, err: &impl std::fmt::Display) -> ToolCallResult {
    ToolCallResult::error(format!("Error {}: {}", action, err))
}

fn pretty<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "[]".to_string())
}

/// Bulleted list under a heading, one entry per line
pub fn bullet_list<S: AsRef<str>>(heading: &str, entries: &[S]) -> String {
    let mut text = String::from(heading);
    for entry in entries {
        text.push_str("\n• ");
        text.push_str(entry.as_ref());
    }
    text
}

pub fn inbox_listing(items: &[TaskItem]) -> String {
    format!(
        "Found {} items in Things3 inbox:\n\n{}",
        items.len(),
        pretty(&items)
    )
}

/// A bounded slice of a larger result set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CappedSample<'a, T> {
    pub items: &'a [T],
    pub total: usize,
}

/// Keep at most `cap` leading items while remembering the true total
pub fn cap_sample<T>(items: &[T], cap: usize) -> CappedSample<'_, T> {
    CappedSample {
        items: &items[..items.len().min(cap)],
        total: items.len(),
    }
}

#[derive(Serialize)]
struct TaskSummary<'a> {
    name: &'a str,
    id: &'a str,
}

pub fn today_listing(items: &[TaskItem], cap: usize) -> String {
    let sample = cap_sample(items, cap);
    let summaries: Vec<TaskSummary<'_>> = sample
        .items
        .iter()
        .map(|t| TaskSummary {
            name: &t.name,
            id: &t.id,
        })
        .collect();
    format!(
        "Found {} items in Things3 today list (showing first {}):\n\n{}",
        sample.total,
        sample.items.len(),
        pretty(&summaries)
    )
}

pub fn project_listing(project: &str, items: &[TaskItem]) -> String {
    let names: Vec<&str> = items.iter().map(|t| t.name.as_str()).collect();
    bullet_list(&format!("Todos for project \"{}\":", project), &names)
}

/// Numbered knowledge-base hits with score, source and chunk
pub fn knowledge_hits(query: &str, hits: &[KnowledgeHit]) -> String {
    if hits.is_empty() {
        return format!("No knowledge base results for \"{}\"", query);
    }
    let mut text = format!("Found {} results for \"{}\":", hits.len(), query);
    for (rank, hit) in hits.iter().enumerate() {
        text.push_str(&format!(
            "\n\n{}. [score {:.4}] {} (chunk {})\n{}",
            rank + 1,
            hit.score,
            hit.source_path,
            hit.chunk_index,
            hit.text.trim()
        ));
    }
    text
}

pub fn web_results(query: &str, results: &[WebResult]) -> String {
    if results.is_empty() {
        return format!("No web results for \"{}\"", query);
    }
    let mut text = format!("Web results for \"{}\":", query);
    for (rank, result) in results.iter().enumerate() {
        text.push_str(&format!("\n\n{}. {}\n   {}", rank + 1, result.title, result.url));
        if !result.description.is_empty() {
            text.push_str(&format!("\n   {}", result.description));
        }
    }
    text
}
