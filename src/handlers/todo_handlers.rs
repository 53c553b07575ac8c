use axum::extract::State;
use chrono::Utc;
use tracing::{debug, info, instrument};

use crate::auth::AuthUser;
use crate::dto::{set_done, CreateTodoDto, UpdateTodoDto};
use crate::errors::ApiError;
use crate::extract::{Json, Path};
use crate::models::Todo;
use crate::repo;
use crate::state::AppState;
use crate::sync::{self, SyncReport};
use crate::views;

async fn save_and_push(state: &AppState, todo: Todo) -> Result<Todo, ApiError> {
    let todo = repo::save_todo(&state.pool, todo)
        .await
        .map_err(ApiError::Database)?
        .ok_or(ApiError::NotFound)?;
    sync::push_todo(state, &todo).await;
    Ok(todo)
}

/// Handler for listing todos
///
/// This function handles GET requests to `/todos`. Open todos come first,
/// then by due date with undated ones last.
#[instrument(skip(state, user))]
pub async fn list_todos_handler(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<Todo>>, ApiError> {
    let mut todos = repo::list_todos(&state.pool, &user.user_id).map_err(ApiError::Database)?;
    views::sort_todos(&mut todos);

    debug!("Retrieved {} todos", todos.len());
    Ok(Json(todos))
}

/// Handler for creating a local todo
///
/// This function handles POST requests to `/todos`.
#[instrument(skip(state, user, payload), fields(title = %payload.title))]
pub async fn create_todo_handler(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateTodoDto>,
) -> Result<Json<Todo>, ApiError> {
    info!("Creating todo");

    let todo = payload.into_todo(&user.user_id).map_err(ApiError::BadRequest)?;
    let todo = repo::create_todo(&state.pool, todo).await.map_err(ApiError::Database)?;

    Ok(Json(todo))
}

/// Handler for updating a todo
///
/// This function handles PATCH requests to `/todos/{id}`. Synced todos push
/// their new state to the workspace page on a best-effort basis.
#[instrument(skip(state, user, payload))]
pub async fn update_todo_handler(
    State(state): State<AppState>,
    user: AuthUser,
    Path(todo_id): Path<String>,
    Json(payload): Json<UpdateTodoDto>,
) -> Result<Json<Todo>, ApiError> {
    let todo = repo::get_todo(&state.pool, &user.user_id, &todo_id)
        .map_err(ApiError::Database)?
        .ok_or(ApiError::NotFound)?;

    let todo = payload.apply(todo, Utc::now().naive_utc()).map_err(ApiError::BadRequest)?;
    Ok(Json(save_and_push(&state, todo).await?))
}

/// Handler for flipping a todo between open and done
///
/// This function handles POST requests to `/todos/{id}/toggle`.
#[instrument(skip(state, user))]
pub async fn toggle_todo_handler(
    State(state): State<AppState>,
    user: AuthUser,
    Path(todo_id): Path<String>,
) -> Result<Json<Todo>, ApiError> {
    let mut todo = repo::get_todo(&state.pool, &user.user_id, &todo_id)
        .map_err(ApiError::Database)?
        .ok_or(ApiError::NotFound)?;

    let done = !todo.done;
    set_done(&mut todo, done, Utc::now().naive_utc());
    info!(done, "Toggled todo");

    Ok(Json(save_and_push(&state, todo).await?))
}

/// Handler for deleting a todo
///
/// This function handles DELETE requests to `/todos/{id}`. The workspace
/// page of a synced todo is left alone; the next sync brings it back.
#[instrument(skip(state, user))]
pub async fn delete_todo_handler(
    State(state): State<AppState>,
    user: AuthUser,
    Path(todo_id): Path<String>,
) -> Result<Json<()>, ApiError> {
    let deleted = repo::delete_todo(&state.pool, &user.user_id, &todo_id)
        .await
        .map_err(ApiError::Database)?;

    if !deleted {
        return Err(ApiError::NotFound);
    }
    Ok(Json(()))
}

/// Handler pulling the workspace todo database into the store
///
/// This function handles POST requests to `/todos/sync`.
#[instrument(skip(state, user))]
pub async fn sync_todos_handler(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<SyncReport>, ApiError> {
    let report = sync::sync_todos(&state, &user.user_id).await?;
    Ok(Json(report))
}
