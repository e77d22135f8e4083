//! Core types for taskgate

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Opaque Things3 identifier, stable across updates
pub type TaskId = String;

/// A to-do item as the task manager reports it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskItem {
    /// Unique identifier
    pub id: TaskId,
    /// Title of the to-do
    pub name: String,
    /// Completion status
    #[serde(default)]
    pub status: TaskStatus,
    /// Free-form notes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Tag names (a set; serialized sorted)
    #[serde(default)]
    pub tags: BTreeSet<String>,
    /// Name of the owning project
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    /// Due date as reported by the task manager
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
}

impl TaskItem {
    /// Create an open item with no optional fields set
    pub fn new(id: impl Into<TaskId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            status: TaskStatus::Open,
            notes: None,
            tags: BTreeSet::new(),
            project: None,
            due_date: None,
        }
    }
}

/// Status of a to-do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    #[default]
    Open,
    Completed,
    Canceled,
}

impl TaskStatus {
    pub const ALL: &'static [&'static str] = &["open", "completed", "canceled"];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Open => "open",
            TaskStatus::Completed => "completed",
            TaskStatus::Canceled => "canceled",
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "open" => Ok(TaskStatus::Open),
            "completed" => Ok(TaskStatus::Completed),
            // Things reports the British spelling in some locales
            "canceled" | "cancelled" => Ok(TaskStatus::Canceled),
            _ => Err(format!("Unknown task status: {}", s)),
        }
    }
}

/// One ranked chunk returned by the knowledge base
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeHit {
    /// Similarity score (higher is better)
    pub score: f32,
    /// Path of the source document, relative to the vault root
    pub source_path: String,
    /// Position of the chunk within its document
    pub chunk_index: u32,
    /// Chunk text
    pub text: String,
}

/// Sort hits by descending score, breaking ties by source and chunk so a
/// single query always yields the same order.
pub fn rank_hits(hits: &mut [KnowledgeHit]) {
    hits.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.source_path.cmp(&b.source_path))
            .then_with(|| a.chunk_index.cmp(&b.chunk_index))
    });
}

/// One web search result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebResult {
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub description: String,
}

/// Hard ceiling on web search results per call
pub const MAX_WEB_RESULTS: usize = 10;

/// Clamp a requested web result count into `1..=MAX_WEB_RESULTS`
pub fn clamp_web_limit(requested: i64) -> usize {
    requested.clamp(1, MAX_WEB_RESULTS as i64) as usize
}

/// Safe-search level passed through to the web search provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SafeSearch {
    Off,
    #[default]
    Moderate,
    Strict,
}

impl SafeSearch {
    pub const ALL: &'static [&'static str] = &["off", "moderate", "strict"];

    pub fn as_str(&self) -> &'static str {
        match self {
            SafeSearch::Off => "off",
            SafeSearch::Moderate => "moderate",
            SafeSearch::Strict => "strict",
        }
    }
}

impl std::str::FromStr for SafeSearch {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "off" => Ok(SafeSearch::Off),
            "moderate" => Ok(SafeSearch::Moderate),
            "strict" => Ok(SafeSearch::Strict),
            _ => Err(format!("Unknown safe-search level: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_item_camel_case_round_trip() {
        let json = serde_json::json!({
            "id": "T1",
            "name": "Buy milk",
            "status": "open",
            "tags": ["home", "errand", "home"],
            "dueDate": "2026-10-20"
        });
        let item: TaskItem = serde_json::from_value(json).unwrap();
        assert_eq!(item.tags.len(), 2);
        assert_eq!(item.due_date.as_deref(), Some("2026-10-20"));
        assert!(item.project.is_none());

        let back = serde_json::to_value(&item).unwrap();
        assert_eq!(back["dueDate"], "2026-10-20");
        assert!(back.get("notes").is_none());
    }

    #[test]
    fn test_status_defaults_to_open() {
        let item: TaskItem =
            serde_json::from_value(serde_json::json!({"id": "T2", "name": "x"})).unwrap();
        assert_eq!(item.status, TaskStatus::Open);
        assert_eq!("Cancelled".parse::<TaskStatus>(), Ok(TaskStatus::Canceled));
    }

    #[test]
    fn test_rank_hits_is_deterministic_on_ties() {
        let hit = |score: f32, path: &str, chunk: u32| KnowledgeHit {
            score,
            source_path: path.to_string(),
            chunk_index: chunk,
            text: String::new(),
        };
        let mut hits = vec![
            hit(0.5, "b.md", 0),
            hit(0.9, "z.md", 3),
            hit(0.5, "a.md", 2),
            hit(0.5, "a.md", 1),
        ];
        rank_hits(&mut hits);
        let order: Vec<_> = hits
            .iter()
            .map(|h| (h.source_path.as_str(), h.chunk_index))
            .collect();
        assert_eq!(order, vec![("z.md", 3), ("a.md", 1), ("a.md", 2), ("b.md", 0)]);
    }

    #[test]
    fn test_clamp_web_limit() {
        assert_eq!(clamp_web_limit(100), MAX_WEB_RESULTS);
        assert_eq!(clamp_web_limit(0), 1);
        assert_eq!(clamp_web_limit(-5), 1);
        assert_eq!(clamp_web_limit(7), 7);
    }
}
