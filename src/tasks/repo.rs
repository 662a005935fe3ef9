use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

/// Task record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Task {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub due_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub reminder_at: Option<OffsetDateTime>,
    pub is_completed: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Incomplete task joined with its owner's email, as seen by the scanners.
#[derive(Debug, Clone, FromRow)]
pub struct PendingTask {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub due_at: OffsetDateTime,
    pub reminder_at: Option<OffsetDateTime>,
    pub owner_email: String,
}

/// Partial-field update; `None` leaves the column unchanged.
#[derive(Debug, Default, Clone)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub due_at: Option<OffsetDateTime>,
    pub reminder_at: Option<OffsetDateTime>,
    pub is_completed: Option<bool>,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.due_at.is_none()
            && self.reminder_at.is_none()
            && self.is_completed.is_none()
    }
}

pub async fn create(
    db: &PgPool,
    user_id: Uuid,
    title: &str,
    description: Option<&str>,
    due_at: OffsetDateTime,
    reminder_at: OffsetDateTime,
) -> anyhow::Result<Task> {
    let task = sqlx::query_as::<_, Task>(
        r#"
        INSERT INTO tasks (user_id, title, description, due_at, reminder_at)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id, user_id, title, description, due_at, reminder_at, is_completed, created_at
        "#,
    )
    .bind(user_id)
    .bind(title)
    .bind(description)
    .bind(due_at)
    .bind(reminder_at)
    .fetch_one(db)
    .await?;
    Ok(task)
}

pub async fn list_by_user(db: &PgPool, user_id: Uuid) -> anyhow::Result<Vec<Task>> {
    let rows = sqlx::query_as::<_, Task>(
        r#"
        SELECT id, user_id, title, description, due_at, reminder_at, is_completed, created_at
        FROM tasks
        WHERE user_id = $1
        ORDER BY due_at ASC
        "#,
    )
    .bind(user_id)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

pub async fn find_owned(db: &PgPool, user_id: Uuid, task_id: Uuid) -> anyhow::Result<Option<Task>> {
    let task = sqlx::query_as::<_, Task>(
        r#"
        SELECT id, user_id, title, description, due_at, reminder_at, is_completed, created_at
        FROM tasks
        WHERE id = $1 AND user_id = $2
        "#,
    )
    .bind(task_id)
    .bind(user_id)
    .fetch_optional(db)
    .await?;
    Ok(task)
}

/// Owner-scoped partial update. Returns `None` when the task does not exist
/// or belongs to another user.
pub async fn update(
    db: &PgPool,
    user_id: Uuid,
    task_id: Uuid,
    patch: &TaskPatch,
) -> anyhow::Result<Option<Task>> {
    let task = sqlx::query_as::<_, Task>(
        r#"
        UPDATE tasks
        SET title = COALESCE($3, title),
            description = COALESCE($4, description),
            due_at = COALESCE($5, due_at),
            reminder_at = COALESCE($6, reminder_at),
            is_completed = COALESCE($7, is_completed)
        WHERE id = $1 AND user_id = $2
        RETURNING id, user_id, title, description, due_at, reminder_at, is_completed, created_at
        "#,
    )
    .bind(task_id)
    .bind(user_id)
    .bind(&patch.title)
    .bind(&patch.description)
    .bind(patch.due_at)
    .bind(patch.reminder_at)
    .bind(patch.is_completed)
    .fetch_optional(db)
    .await?;
    Ok(task)
}

/// Owner-scoped delete. Returns `false` when nothing was deleted.
pub async fn delete(db: &PgPool, user_id: Uuid, task_id: Uuid) -> anyhow::Result<bool> {
    let result = sqlx::query(r#"DELETE FROM tasks WHERE id = $1 AND user_id = $2"#)
        .bind(task_id)
        .bind(user_id)
        .execute(db)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// All incomplete tasks joined with owner email, for one scan cycle.
pub async fn list_incomplete_with_owner_email(db: &PgPool) -> anyhow::Result<Vec<PendingTask>> {
    let rows = sqlx::query_as::<_, PendingTask>(
        r#"
        SELECT t.id, t.title, t.description, t.due_at, t.reminder_at, u.email AS owner_email
        FROM tasks t
        JOIN users u ON u.id = t.user_id
        WHERE t.is_completed = FALSE
        "#,
    )
    .fetch_all(db)
    .await?;
    Ok(rows)
}

pub async fn find_owner_email(db: &PgPool, user_id: Uuid) -> anyhow::Result<Option<String>> {
    let email = sqlx::query_scalar::<_, String>(r#"SELECT email FROM users WHERE id = $1"#)
        .bind(user_id)
        .fetch_optional(db)
        .await?;
    Ok(email)
}
