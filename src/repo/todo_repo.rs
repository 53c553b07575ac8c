use crate::db::{DbPool, ExecuteWithRetry};
use crate::models::Todo;
use crate::schema::todos;
use chrono::Utc;
use diesel::prelude::*;
use anyhow::Result;
use tracing::{instrument, debug, info};

/// Inserts a todo
///
/// ### Arguments
///
/// * `pool` - A reference to the database connection pool
/// * `new_todo` - The row to insert
///
/// ### Returns
///
/// A Result containing the inserted Todo
///
/// ### Errors
///
/// Returns an error if:
/// - Unable to get a connection from the pool
/// - The insert fails, including when another todo of the same user already
///   mirrors the same workspace page
#[instrument(skip(pool, new_todo), fields(todo_id = %new_todo.id))]
pub async fn create_todo(pool: &DbPool, new_todo: Todo) -> Result<Todo> {
    debug!("Creating todo");

    let mut conn = pool.get()?;

    diesel::insert_into(todos::table)
        .values(new_todo.clone())
        .execute_with_retry(&mut conn).await?;

    info!("Created todo with id: {}", new_todo.id);
    Ok(new_todo)
}

/// Retrieves a todo owned by `user_id`
#[instrument(skip(pool))]
pub fn get_todo(pool: &DbPool, user_id: &str, todo_id: &str) -> Result<Option<Todo>> {
    debug!("Retrieving todo by id");

    let conn = &mut pool.get()?;

    let result = todos::table
        .filter(todos::id.eq(todo_id))
        .filter(todos::user_id.eq(user_id))
        .select(Todo::as_select())
        .first(conn)
        .optional()?;

    Ok(result)
}

/// Lists every todo of a user in creation order
#[instrument(skip(pool))]
pub fn list_todos(pool: &DbPool, user_id: &str) -> Result<Vec<Todo>> {
    let conn = &mut pool.get()?;

    let result = todos::table
        .filter(todos::user_id.eq(user_id))
        .order(todos::created_at.asc())
        .select(Todo::as_select())
        .load(conn)?;

    debug!("Retrieved {} todos", result.len());
    Ok(result)
}

/// Lists the todos of a user that mirror a workspace page
#[instrument(skip(pool))]
pub fn list_synced_todos(pool: &DbPool, user_id: &str) -> Result<Vec<Todo>> {
    let conn = &mut pool.get()?;

    let result = todos::table
        .filter(todos::user_id.eq(user_id))
        .filter(todos::notion_page_id.is_not_null())
        .select(Todo::as_select())
        .load(conn)?;

    debug!("Retrieved {} synced todos", result.len());
    Ok(result)
}

/// Writes every column of `updated` back to its row and bumps `updated_at`
///
/// ### Returns
///
/// A Result containing the saved row, or None if the todo does not exist
/// for that user
#[instrument(skip(pool, updated), fields(todo_id = %updated.id))]
pub async fn save_todo(pool: &DbPool, mut updated: Todo) -> Result<Option<Todo>> {
    debug!("Saving todo");

    updated.updated_at = Utc::now().naive_utc();

    let mut conn = pool.get()?;

    let rows = diesel::update(
        todos::table
            .filter(todos::id.eq(updated.id.clone()))
            .filter(todos::user_id.eq(updated.user_id.clone())),
    )
    .set(&updated)
    .execute_with_retry(&mut conn).await?;

    if rows == 0 {
        return Ok(None);
    }

    info!("Saved todo with id: {}", updated.id);
    Ok(Some(updated))
}

/// Deletes a todo owned by `user_id`, returning whether a row was removed
#[instrument(skip(pool))]
pub async fn delete_todo(pool: &DbPool, user_id: &str, todo_id: &str) -> Result<bool> {
    let mut conn = pool.get()?;

    let rows = diesel::delete(
        todos::table
            .filter(todos::id.eq(todo_id.to_string()))
            .filter(todos::user_id.eq(user_id.to_string())),
    )
    .execute_with_retry(&mut conn).await?;

    if rows > 0 {
        info!("Deleted todo with id: {}", todo_id);
    }
    Ok(rows > 0)
}

/// Deletes several todos of a user at once
///
/// ### Returns
///
/// A Result containing the number of rows removed
#[instrument(skip(pool, todo_ids), fields(count = todo_ids.len()))]
pub async fn delete_todos(pool: &DbPool, user_id: &str, todo_ids: &[String]) -> Result<usize> {
    if todo_ids.is_empty() {
        return Ok(0);
    }

    let mut conn = pool.get()?;

    let rows = diesel::delete(
        todos::table
            .filter(todos::id.eq_any(todo_ids.to_vec()))
            .filter(todos::user_id.eq(user_id.to_string())),
    )
    .execute_with_retry(&mut conn).await?;

    info!("Deleted {} todos", rows);
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TodoPriority;
    use crate::test_utils::setup_test_db;

    #[tokio::test]
    async fn test_todo_crud() {
        let pool = setup_test_db();

        let created = create_todo(&pool, Todo::new("alice", "Pay rent".to_string())).await.unwrap();
        create_todo(&pool, Todo::new("bob", "Not yours".to_string())).await.unwrap();

        let listed = list_todos(&pool, "alice").unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].title, "Pay rent");

        let mut changed = created.clone();
        changed.done = true;
        changed.priority = Some(TodoPriority::High);
        let saved = save_todo(&pool, changed).await.unwrap().unwrap();
        assert!(saved.done);

        let fetched = get_todo(&pool, "alice", &created.id).unwrap().unwrap();
        assert_eq!(fetched.priority, Some(TodoPriority::High));
        assert!(get_todo(&pool, "bob", &created.id).unwrap().is_none());

        assert!(delete_todo(&pool, "alice", &created.id).await.unwrap());
        assert!(!delete_todo(&pool, "alice", &created.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_notion_page_is_unique_per_user() {
        let pool = setup_test_db();

        let mut first = Todo::new("alice", "One".to_string());
        first.notion_page_id = Some("page-1".to_string());
        create_todo(&pool, first).await.unwrap();

        let mut duplicate = Todo::new("alice", "Two".to_string());
        duplicate.notion_page_id = Some("page-1".to_string());
        assert!(create_todo(&pool, duplicate).await.is_err());

        let mut other_user = Todo::new("bob", "Three".to_string());
        other_user.notion_page_id = Some("page-1".to_string());
        assert!(create_todo(&pool, other_user).await.is_ok());

        // Local todos have no page id and never collide
        create_todo(&pool, Todo::new("alice", "Local A".to_string())).await.unwrap();
        create_todo(&pool, Todo::new("alice", "Local B".to_string())).await.unwrap();

        let synced = list_synced_todos(&pool, "alice").unwrap();
        assert_eq!(synced.len(), 1);
        assert_eq!(synced[0].title, "One");
    }

    #[tokio::test]
    async fn test_delete_todos_is_scoped() {
        let pool = setup_test_db();
        let a = create_todo(&pool, Todo::new("alice", "A".to_string())).await.unwrap();
        let b = create_todo(&pool, Todo::new("alice", "B".to_string())).await.unwrap();
        let c = create_todo(&pool, Todo::new("bob", "C".to_string())).await.unwrap();

        let removed = delete_todos(&pool, "alice", &[a.id.clone(), c.id.clone()]).await.unwrap();
        assert_eq!(removed, 1);
        assert!(get_todo(&pool, "alice", &b.id).unwrap().is_some());
        assert!(get_todo(&pool, "bob", &c.id).unwrap().is_some());

        assert_eq!(delete_todos(&pool, "alice", &[]).await.unwrap(), 0);
    }
}
