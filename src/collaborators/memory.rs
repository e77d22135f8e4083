//! In-memory task store seeded from a JSON fixture
//!
//! Mirrors the Things3 store's observable behavior closely enough to run the
//! gateway without macOS: an update fully replaces the item and schedules it
//! for today, which takes it out of the inbox.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use super::TaskStore;
use crate::error::{GatewayError, Result};
use crate::types::{TaskId, TaskItem};

/// Fixture file layout
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskFixture {
    #[serde(default)]
    pub inbox: Vec<TaskItem>,
    #[serde(default)]
    pub today: Vec<TaskItem>,
    /// Items in neither list (e.g. anytime/someday project items)
    #[serde(default)]
    pub other: Vec<TaskItem>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub projects: Vec<String>,
}

#[derive(Debug, Default)]
struct StoreState {
    items: HashMap<TaskId, TaskItem>,
    /// Insertion order, for stable listings
    order: Vec<TaskId>,
    inbox: Vec<TaskId>,
    today: Vec<TaskId>,
    tags: Vec<String>,
    projects: Vec<String>,
}

impl StoreState {
    fn insert(&mut self, item: TaskItem) -> TaskId {
        let id = item.id.clone();
        if self.items.insert(id.clone(), item).is_none() {
            self.order.push(id.clone());
        }
        id
    }

    fn resolve(&self, ids: &[TaskId]) -> Vec<TaskItem> {
        ids.iter()
            .filter_map(|id| self.items.get(id).cloned())
            .collect()
    }
}

/// Thread-safe in-memory task store
#[derive(Debug, Clone, Default)]
pub struct InMemoryTaskStore {
    state: Arc<RwLock<StoreState>>,
}

impl InMemoryTaskStore {
    /// Creates an empty store
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_fixture(fixture: TaskFixture) -> Self {
        let mut state = StoreState {
            tags: fixture.tags,
            projects: fixture.projects,
            ..StoreState::default()
        };
        for item in fixture.inbox {
            let id = state.insert(item);
            state.inbox.push(id);
        }
        for item in fixture.today {
            let id = state.insert(item);
            state.today.push(id);
        }
        for item in fixture.other {
            state.insert(item);
        }
        Self {
            state: Arc::new(RwLock::new(state)),
        }
    }

    /// Load a fixture file (`~` is expanded)
    pub fn load(path: &str) -> Result<Self> {
        let expanded = shellexpand::tilde(path).to_string();
        let raw = std::fs::read_to_string(Path::new(&expanded)).map_err(|e| {
            GatewayError::Config(format!("Cannot read task fixture {}: {}", expanded, e))
        })?;
        let fixture: TaskFixture = serde_json::from_str(&raw)?;
        tracing::info!(
            "Loaded task fixture {} ({} inbox, {} today)",
            expanded,
            fixture.inbox.len(),
            fixture.today.len()
        );
        Ok(Self::from_fixture(fixture))
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn fetch_inbox(&self) -> Result<Vec<TaskItem>> {
        let state = self.state.read();
        Ok(state.resolve(&state.inbox))
    }

    async fn fetch_today(&self) -> Result<Vec<TaskItem>> {
        let state = self.state.read();
        Ok(state.resolve(&state.today))
    }

    async fn list_tags(&self) -> Result<Vec<String>> {
        Ok(self.state.read().tags.clone())
    }

    async fn list_projects(&self) -> Result<Vec<String>> {
        Ok(self.state.read().projects.clone())
    }

    async fn list_project_items(&self, project: &str) -> Result<Vec<TaskItem>> {
        let state = self.state.read();
        Ok(state
            .order
            .iter()
            .filter_map(|id| state.items.get(id))
            .filter(|item| item.project.as_deref() == Some(project))
            .cloned()
            .collect())
    }

    async fn update_item(&self, item: &TaskItem) -> Result<()> {
        let mut state = self.state.write();
        let Some(existing) = state.items.get_mut(&item.id) else {
            return Err(GatewayError::TaskNotFound(item.id.clone()));
        };
        *existing = item.clone();

        state.inbox.retain(|id| id != &item.id);
        if !state.today.contains(&item.id) {
            state.today.push(item.id.clone());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn fixture() -> TaskFixture {
        let mut milk = TaskItem::new("T1", "Buy milk");
        milk.notes = Some("semi-skimmed".into());
        let mut paint = TaskItem::new("T3", "Paint fence");
        paint.project = Some("House".into());
        TaskFixture {
            inbox: vec![milk, TaskItem::new("T2", "Call bank")],
            today: vec![],
            other: vec![paint],
            tags: vec!["work".into(), "home".into()],
            projects: vec!["Groceries".into(), "House".into()],
        }
    }

    #[tokio::test]
    async fn test_update_replaces_and_moves_out_of_inbox() {
        let store = InMemoryTaskStore::from_fixture(fixture());

        let mut update = TaskItem::new("T1", "Buy milk");
        update.project = Some("Groceries".into());
        store.update_item(&update).await.unwrap();

        let inbox = store.fetch_inbox().await.unwrap();
        assert_eq!(inbox.len(), 1);
        assert_eq!(inbox[0].id, "T2");

        let today = store.fetch_today().await.unwrap();
        assert_eq!(today.len(), 1);
        // Full replace: the notes that were not sent are gone
        assert_eq!(today[0].notes, None);
        assert_eq!(today[0].project.as_deref(), Some("Groceries"));
    }

    #[tokio::test]
    async fn test_update_unknown_item() {
        let store = InMemoryTaskStore::from_fixture(fixture());
        let err = store
            .update_item(&TaskItem::new("missing", "x"))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::TaskNotFound(id) if id == "missing"));
    }

    #[tokio::test]
    async fn test_project_items() {
        let store = InMemoryTaskStore::from_fixture(fixture());
        let house = store.list_project_items("House").await.unwrap();
        assert_eq!(house.len(), 1);
        assert_eq!(house[0].name, "Paint fence");
        assert!(store.list_project_items("Nope").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_load_fixture_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"inbox": [{{"id": "A", "name": "Write report", "tags": ["work"]}}], "tags": ["work"]}}"#
        )
        .unwrap();

        let store = InMemoryTaskStore::load(file.path().to_str().unwrap()).unwrap();
        let inbox = store.fetch_inbox().await.unwrap();
        assert_eq!(inbox[0].name, "Write report");
        assert!(store.list_projects().await.unwrap().is_empty());
    }

    #[test]
    fn test_load_missing_fixture_is_config_error() {
        let err = InMemoryTaskStore::load("/nonexistent/fixture.json").unwrap_err();
        assert!(matches!(err, GatewayError::Config(_)));
    }
}
