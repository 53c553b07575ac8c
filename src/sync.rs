//! Synchronisation of todos between the workspace todo database and the store

use std::collections::{HashMap, HashSet};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::dto::set_done;
use crate::errors::ApiError;
use crate::models::Todo;
use crate::repo;
use crate::state::AppState;
use crate::workspace::WorkspaceTodo;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("{0} is not configured")]
    NotConfigured(&'static str),

    #[error("{0}")]
    Upstream(String),

    #[error(transparent)]
    Database(#[from] anyhow::Error),
}

impl From<SyncError> for ApiError {
    fn from(err: SyncError) -> Self {
        match err {
            SyncError::NotConfigured(what) => ApiError::NotConfigured(what.to_string()),
            SyncError::Upstream(msg) => ApiError::Upstream(msg),
            SyncError::Database(err) => ApiError::Database(err),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SyncReport {
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub removed: usize,
}

/// Copies the page fields onto a local todo; true if anything changed
fn apply_page(todo: &mut Todo, page: &WorkspaceTodo) -> bool {
    let changed =
        todo.title != page.title || todo.done != page.done || todo.due != page.due || todo.priority != page.priority;
    if changed {
        todo.title = page.title.clone();
        todo.due = page.due;
        todo.priority = page.priority;
        set_done(todo, page.done, Utc::now().naive_utc());
    }
    changed
}

/// Pulls the todos database into the store
///
/// Each live page is upserted by its page id. Local rows linked to a page
/// that is gone or archived are deleted. Pages without a title are ignored.
///
/// ### Errors
///
/// * `NotConfigured` without a workspace token or todos database
/// * `Upstream` if the database query fails; nothing is written in that case
#[instrument(skip(state))]
pub async fn sync_todos(state: &AppState, user_id: &str) -> Result<SyncReport, SyncError> {
    let workspace = state.services.workspace.as_ref().ok_or(SyncError::NotConfigured("Notion"))?;
    let database_id = state.config.notion_todos_db.as_deref().ok_or(SyncError::NotConfigured("Notion todos database"))?;

    let pages = workspace
        .query_database(database_id, None)
        .await
        .map_err(|e| SyncError::Upstream(e.to_string()))?;
    debug!("Workspace returned {} todo pages", pages.len());

    let mapping = state.mapping();
    // Untitled pages are skipped but still count as live
    let live: HashSet<&str> = pages.iter().filter(|page| !page.archived).map(|page| page.id.as_str()).collect();
    let remote: Vec<WorkspaceTodo> = pages
        .iter()
        .filter_map(|page| mapping.todo_from_page(page))
        .filter(|todo| !todo.archived)
        .collect();

    let mut local: HashMap<String, Todo> = repo::list_synced_todos(&state.pool, user_id)?
        .into_iter()
        .filter_map(|todo| todo.notion_page_id.clone().map(|page_id| (page_id, todo)))
        .collect();

    let mut report = SyncReport::default();
    let mut seen = HashSet::new();

    for page in &remote {
        if !seen.insert(page.page_id.clone()) {
            continue;
        }
        match local.remove(&page.page_id) {
            Some(mut todo) => {
                if apply_page(&mut todo, page) {
                    repo::save_todo(&state.pool, todo).await?;
                    report.updated += 1;
                } else {
                    report.unchanged += 1;
                }
            }
            None => {
                let mut todo = Todo::new(user_id, page.title.clone());
                todo.notion_page_id = Some(page.page_id.clone());
                todo.due = page.due;
                todo.priority = page.priority;
                set_done(&mut todo, page.done, Utc::now().naive_utc());
                repo::create_todo(&state.pool, todo).await?;
                report.created += 1;
            }
        }
    }

    let stale: Vec<String> = local
        .into_iter()
        .filter(|(page_id, _)| !live.contains(page_id.as_str()))
        .map(|(_, todo)| todo.id)
        .collect();
    report.removed = repo::delete_todos(&state.pool, user_id, &stale).await?;

    info!(
        created = report.created,
        updated = report.updated,
        unchanged = report.unchanged,
        removed = report.removed,
        "Synced todos"
    );
    Ok(report)
}

/// Pushes title, done, due and priority of a synced todo to its page; true on success
pub async fn push_todo(state: &AppState, todo: &Todo) -> bool {
    let (Some(workspace), Some(page_id)) = (state.services.workspace.as_ref(), todo.notion_page_id.as_deref()) else {
        return false;
    };

    match workspace.update_page(page_id, state.mapping().todo_properties(todo)).await {
        Ok(_) => true,
        Err(e) => {
            warn!(page_id, "Could not push todo to workspace page: {}", e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TodoPriority;
    use crate::test_utils::{fake_state, setup_test_db, test_state};
    use serde_json::{json, Value};

    fn todo_page(id: &str, title: &str, done: bool) -> Value {
        json!({
            "id": id,
            "archived": false,
            "properties": {
                "Name": {"type": "title", "title": [{"plain_text": title}]},
                "Done": {"type": "checkbox", "checkbox": done},
                "Due": {"type": "date", "date": {"start": "2024-02-03"}},
                "Priority": {"type": "select", "select": {"name": "High"}}
            }
        })
    }

    #[tokio::test]
    async fn test_sync_creates_then_reports_unchanged() {
        let (state, fake) = fake_state(setup_test_db()).await;
        fake.set_pages(vec![todo_page("p1", "Buy milk", false), todo_page("p2", "File taxes", true)]);

        let first = sync_todos(&state, "owner").await.unwrap();
        assert_eq!(first, SyncReport { created: 2, ..SyncReport::default() });

        let todos = repo::list_todos(&state.pool, "owner").unwrap();
        let taxes = todos.iter().find(|t| t.title == "File taxes").unwrap();
        assert!(taxes.done);
        assert!(taxes.completed_at.is_some());
        assert_eq!(taxes.priority, Some(TodoPriority::High));

        let second = sync_todos(&state, "owner").await.unwrap();
        assert_eq!(second, SyncReport { unchanged: 2, ..SyncReport::default() });
    }

    #[tokio::test]
    async fn test_sync_updates_and_removes() {
        let (state, fake) = fake_state(setup_test_db()).await;
        fake.set_pages(vec![todo_page("p1", "Buy milk", false), todo_page("p2", "File taxes", false)]);
        sync_todos(&state, "owner").await.unwrap();

        let mut archived = todo_page("p2", "File taxes", false);
        archived["archived"] = json!(true);
        fake.set_pages(vec![todo_page("p1", "Buy oat milk", true), archived]);

        let report = sync_todos(&state, "owner").await.unwrap();
        assert_eq!(report, SyncReport { updated: 1, removed: 1, ..SyncReport::default() });

        let todos = repo::list_todos(&state.pool, "owner").unwrap();
        assert_eq!(todos.len(), 1);
        assert_eq!(todos[0].title, "Buy oat milk");
        assert!(todos[0].done);
        assert!(todos[0].completed_at.is_some());
    }

    #[tokio::test]
    async fn test_sync_keeps_local_only_todos() {
        let (state, fake) = fake_state(setup_test_db()).await;
        repo::create_todo(&state.pool, Todo::new("owner", "Local".to_string())).await.unwrap();
        fake.set_pages(vec![]);

        let report = sync_todos(&state, "owner").await.unwrap();
        assert_eq!(report, SyncReport::default());
        assert_eq!(repo::list_todos(&state.pool, "owner").unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_sync_requires_workspace() {
        let state = test_state(setup_test_db());
        let err = sync_todos(&state, "owner").await.unwrap_err();
        assert!(matches!(err, SyncError::NotConfigured("Notion")));
    }

    #[tokio::test]
    async fn test_push_todo() {
        let (state, fake) = fake_state(setup_test_db()).await;
        let mut todo = Todo::new("owner", "Buy milk".to_string());
        assert!(!push_todo(&state, &todo).await);

        todo.notion_page_id = Some("p1".to_string());
        todo.done = true;
        assert!(push_todo(&state, &todo).await);

        todo.notion_page_id = Some("broken".to_string());
        assert!(!push_todo(&state, &todo).await);

        let calls = fake.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].path, "/pages/p1");
        assert_eq!(calls[0].body["properties"]["Done"]["checkbox"], true);
        assert_eq!(calls[0].body["properties"]["Priority"]["select"], Value::Null);
    }

    #[tokio::test]
    async fn test_sync_keeps_rows_of_untitled_pages() {
        let (state, fake) = fake_state(setup_test_db()).await;
        fake.set_pages(vec![todo_page("p1", "Buy milk", false)]);
        sync_todos(&state, "owner").await.unwrap();

        let mut untitled = todo_page("p1", "", false);
        untitled["properties"]["Name"]["title"] = json!([]);
        fake.set_pages(vec![untitled]);

        let report = sync_todos(&state, "owner").await.unwrap();
        assert_eq!(report, SyncReport::default());

        let todos = repo::list_todos(&state.pool, "owner").unwrap();
        assert_eq!(todos.len(), 1);
        assert_eq!(todos[0].title, "Buy milk");
    }

    #[tokio::test]
    async fn test_priority_edit_is_pushed_before_next_sync() {
        let (state, fake) = fake_state(setup_test_db()).await;
        fake.set_pages(vec![todo_page("p1", "Buy milk", false)]);
        sync_todos(&state, "owner").await.unwrap();

        let mut todo = repo::list_todos(&state.pool, "owner").unwrap().remove(0);
        todo.priority = Some(TodoPriority::Low);
        assert!(push_todo(&state, &todo).await);

        let calls = fake.calls();
        let pushed = calls.last().unwrap().body["properties"]["Priority"].clone();
        assert_eq!(pushed["select"]["name"], "Low");

        let mut page = todo_page("p1", "Buy milk", false);
        page["properties"]["Priority"] = json!({"type": "select", "select": pushed["select"].clone()});
        fake.set_pages(vec![page]);

        let report = sync_todos(&state, "owner").await.unwrap();
        assert_eq!(report, SyncReport { unchanged: 1, ..SyncReport::default() });
        let todos = repo::list_todos(&state.pool, "owner").unwrap();
        assert_eq!(todos[0].priority, Some(TodoPriority::Low));
    }
}
