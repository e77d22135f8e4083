//! Things3 task store driven through JavaScript for Automation
//!
//! Each operation renders a small JXA program, runs it with
//! `osascript -l JavaScript -e <script>` and parses the JSON it prints.
//! Values are embedded as JSON literals, so names and notes never need
//! quoting by hand.

use async_trait::async_trait;
use serde::Serialize;
use tokio::process::Command;

use super::{with_timeout, TaskStore};
use crate::config::ThingsConfig;
use crate::error::{GatewayError, Result};
use crate::types::TaskItem;

/// Application name as seen by the scripting bridge
const APP_NAME: &str = "Things3";

/// Shared JXA fragment that converts a to-do into the `TaskItem` shape
const TO_ITEM_JS: &str = r#"
const toItem = (t) => ({
  id: t.id(),
  name: t.name(),
  status: t.status(),
  notes: t.notes() || undefined,
  tags: t.tags().map((tag) => tag.name()),
  project: t.project() ? t.project().name() : undefined,
  dueDate: t.dueDate() ? t.dueDate().toISOString().slice(0, 10) : undefined,
});
"#;

/// Things3 via osascript (macOS only)
pub struct ThingsStore {
    config: ThingsConfig,
}

impl ThingsStore {
    pub fn new(config: ThingsConfig) -> Self {
        Self { config }
    }

    async fn run_script(&self, script: &str) -> Result<String> {
        let mut command = Command::new(&self.config.osascript_path);
        command
            .args(["-l", "JavaScript", "-e", script])
            .kill_on_drop(true);

        let output = with_timeout("AppleScript execution", self.config.script_timeout, async {
            command.output().await.map_err(|e| {
                GatewayError::CollaboratorUnavailable(format!(
                    "AppleScript execution failed: {}",
                    e
                ))
            })
        })
        .await?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !output.status.success() {
            tracing::error!("osascript exited with {}: {}", output.status, stderr.trim());
            return Err(GatewayError::CollaboratorUnavailable(format!(
                "AppleScript execution failed: {}",
                stderr.trim()
            )));
        }
        if !stderr.trim().is_empty() {
            tracing::error!("AppleScript stderr: {}", stderr.trim());
            return Err(GatewayError::CollaboratorUnavailable(format!(
                "AppleScript error: {}",
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    async fn run_json<T: serde::de::DeserializeOwned>(&self, script: &str) -> Result<T> {
        let stdout = self.run_script(script).await?;
        serde_json::from_str(&stdout).map_err(|e| {
            GatewayError::CollaboratorUnavailable(format!(
                "Unexpected output from Things3: {}",
                e
            ))
        })
    }
}

/// Embed a value as a JavaScript literal
fn js_literal<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "null".to_string())
}

fn list_script(list: &str) -> String {
    format!(
        "(() => {{\n  const app = Application({app});\n{to_item}\n  return JSON.stringify(app.lists.byName({list}).toDos().map(toItem));\n}})();",
        app = js_literal(APP_NAME),
        to_item = TO_ITEM_JS,
        list = js_literal(list),
    )
}

fn project_items_script(project: &str) -> String {
    format!(
        "(() => {{\n  const app = Application({app});\n{to_item}\n  return JSON.stringify(app.projects.byName({project}).toDos().map(toItem));\n}})();",
        app = js_literal(APP_NAME),
        to_item = TO_ITEM_JS,
        project = js_literal(project),
    )
}

fn names_script(collection: &str) -> String {
    format!(
        "(() => {{\n  const app = Application({app});\n  return JSON.stringify(app.{collection}().map((x) => x.name()));\n}})();",
        app = js_literal(APP_NAME),
        collection = collection,
    )
}

/// Full replace of the item's fields, then schedule it for today so it
/// leaves the inbox
fn update_script(item: &TaskItem) -> String {
    format!(
        r#"(() => {{
  const app = Application({app});
  const item = {item};
  const t = app.toDos.byId(item.id);
  if (!t.exists()) {{
    return "Not found";
  }}
  t.name = item.name;
  t.notes = item.notes || "";
  t.status = item.status;
  t.tagNames = item.tags.join(", ");
  t.dueDate = item.dueDate ? new Date(item.dueDate) : null;
  if (item.project) {{
    t.project = app.projects.byName(item.project);
  }} else if (t.project()) {{
    t.project = null;
  }}
  app.schedule(t, {{ for: new Date() }});
  return "Updated";
}})();"#,
        app = js_literal(APP_NAME),
        item = js_literal(item),
    )
}

#[async_trait]
impl TaskStore for ThingsStore {
    async fn fetch_inbox(&self) -> Result<Vec<TaskItem>> {
        self.run_json(&list_script("Inbox")).await
    }

    async fn fetch_today(&self) -> Result<Vec<TaskItem>> {
        let items: Vec<TaskItem> = self.run_json(&list_script("Today")).await?;
        tracing::debug!("Retrieved {} items from today's list", items.len());
        Ok(items)
    }

    async fn list_tags(&self) -> Result<Vec<String>> {
        self.run_json(&names_script("tags")).await
    }

    async fn list_projects(&self) -> Result<Vec<String>> {
        self.run_json(&names_script("projects")).await
    }

    async fn list_project_items(&self, project: &str) -> Result<Vec<TaskItem>> {
        self.run_json(&project_items_script(project)).await
    }

    async fn update_item(&self, item: &TaskItem) -> Result<()> {
        match self.run_script(&update_script(item)).await?.as_str() {
            "Updated" => Ok(()),
            "Not found" => Err(GatewayError::TaskNotFound(item.id.clone())),
            other => Err(GatewayError::CollaboratorUnavailable(format!(
                "Unexpected output from Things3: {}",
                other
            ))),
        }
    }
}
