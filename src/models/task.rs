use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::db::DbPool;
use crate::errors::AppError;
use crate::time;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Completed,
}

impl TaskStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Completed => "completed",
        }
    }
}

impl FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(TaskStatus::Pending),
            "completed" => Ok(TaskStatus::Completed),
            _ => Err("Status must be pending or completed".to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Task {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub status: String,
    pub assigned_to: Option<i64>,
    pub assignee_name: Option<String>,
    pub due_date: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct TaskForm {
    pub title: Option<String>,
    pub description: Option<String>,
    pub assigned_to: Option<i64>,
    pub due_date: Option<String>,
    pub status: Option<String>,
}

const SELECT_TASK: &str = "\
    SELECT t.id, t.title, t.description, t.status, t.assigned_to, \
           u.full_name AS assignee_name, t.due_date, t.created_at, t.updated_at \
    FROM tasks t LEFT JOIN users u ON u.id = t.assigned_to";

/// All tasks, or only those assigned to `assignee`. Pending first, then by due date.
pub async fn find_all(pool: &DbPool, assignee: Option<i64>) -> Result<Vec<Task>, AppError> {
    let rows = sqlx::query_as::<_, Task>(&format!(
        "{SELECT_TASK} WHERE (?1 IS NULL OR t.assigned_to = ?1) \
         ORDER BY t.status = 'completed', t.due_date IS NULL, t.due_date, t.id DESC"
    ))
    .bind(assignee)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn find_by_id(pool: &DbPool, id: i64) -> Result<Option<Task>, AppError> {
    let row = sqlx::query_as::<_, Task>(&format!("{SELECT_TASK} WHERE t.id = ?1"))
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

pub async fn create(
    pool: &DbPool,
    title: &str,
    description: &str,
    assigned_to: Option<i64>,
    due_date: Option<&str>,
) -> Result<i64, AppError> {
    let now = time::now();
    let id = sqlx::query_scalar(
        "INSERT INTO tasks (title, description, status, assigned_to, due_date, created_at, updated_at) \
         VALUES (?1, ?2, 'pending', ?3, ?4, ?5, ?5) RETURNING id",
    )
    .bind(title.trim())
    .bind(description.trim())
    .bind(assigned_to)
    .bind(due_date)
    .bind(now)
    .fetch_one(pool)
    .await?;
    Ok(id)
}

pub async fn update(
    pool: &DbPool,
    id: i64,
    title: Option<&str>,
    status: Option<TaskStatus>,
) -> Result<bool, AppError> {
    let result = sqlx::query(
        "UPDATE tasks SET title = COALESCE(?1, title), status = COALESCE(?2, status), updated_at = ?3 \
         WHERE id = ?4",
    )
    .bind(title.map(str::trim))
    .bind(status.map(TaskStatus::as_str))
    .bind(time::now())
    .bind(id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn count_pending(pool: &DbPool) -> Result<i64, AppError> {
    let count = sqlx::query_scalar("SELECT COUNT(*) FROM tasks WHERE status = 'pending'")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

pub async fn count_completed_since(pool: &DbPool, since: &str) -> Result<i64, AppError> {
    let count = sqlx::query_scalar(
        "SELECT COUNT(*) FROM tasks WHERE status = 'completed' AND updated_at >= ?1",
    )
    .bind(since)
    .fetch_one(pool)
    .await?;
    Ok(count)
}
