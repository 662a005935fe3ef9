use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post, put},
    Json, Router,
};
use tracing::{error, instrument, warn};
use uuid::Uuid;

use crate::{auth::jwt::AuthUser, state::AppState, tasks::repo};

use super::dto::{CreateTaskRequest, TaskResponse, UpdateTaskRequest};
use super::services;

pub fn read_routes() -> Router<AppState> {
    Router::new().route("/tasks", get(list_tasks))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/tasks", post(create_task))
        .route("/tasks/:id", put(update_task))
        .route("/tasks/:id", delete(delete_task))
}

#[instrument(skip(state, payload))]
pub async fn create_task(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<CreateTaskRequest>,
) -> Result<(StatusCode, Json<TaskResponse>), (StatusCode, String)> {
    if payload.title.trim().is_empty() {
        warn!("empty task title");
        return Err((StatusCode::BAD_REQUEST, "Title must not be empty".into()));
    }

    let task = services::create_task(
        &state,
        user_id,
        payload.title.trim(),
        payload.description.as_deref(),
        payload.due_at,
        payload.reminder_at,
    )
    .await
    .map_err(internal)?;

    Ok((StatusCode::CREATED, Json(task.into())))
}

#[instrument(skip(state))]
pub async fn list_tasks(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Vec<TaskResponse>>, (StatusCode, String)> {
    let tasks = repo::list_by_user(&state.db, user_id)
        .await
        .map_err(internal)?;
    Ok(Json(tasks.into_iter().map(TaskResponse::from).collect()))
}

#[instrument(skip(state, payload))]
pub async fn update_task(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateTaskRequest>,
) -> Result<Json<TaskResponse>, (StatusCode, String)> {
    let patch: repo::TaskPatch = payload.into();
    if patch.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Nothing to update".into()));
    }

    match services::update_task(&state, user_id, id, patch).await {
        Ok(Some(task)) => Ok(Json(task.into())),
        Ok(None) => {
            warn!(%user_id, %id, "update of missing task");
            Err((StatusCode::NOT_FOUND, "Task not found".into()))
        }
        Err(e) => Err(internal(e)),
    }
}

#[instrument(skip(state))]
pub async fn delete_task(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, (StatusCode, String)> {
    let deleted = repo::delete(&state.db, user_id, id)
        .await
        .map_err(internal)?;
    if deleted {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err((StatusCode::NOT_FOUND, "Task not found".into()))
    }
}

fn internal(e: anyhow::Error) -> (StatusCode, String) {
    error!(error = %e, "task store error");
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}
