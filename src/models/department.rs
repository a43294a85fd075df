use serde::{Deserialize, Serialize};

use crate::db::DbPool;
use crate::errors::{AppError, conflict_on_unique};
use crate::time;
use super::common::{ActiveStatus, ListFilter};

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Department {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub status: String,
    pub created_at: String,
    pub updated_at: Option<String>,
}

/// Request body for create and update; absent fields are left unchanged on update.
#[derive(Debug, Default, Deserialize)]
pub struct DepartmentForm {
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug)]
pub struct DepartmentChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: Option<ActiveStatus>,
}

const DUPLICATE_NAME: &str = "Department name already exists";

pub async fn find_all(pool: &DbPool, filter: &ListFilter) -> Result<Vec<Department>, AppError> {
    let rows = sqlx::query_as::<_, Department>(
        "SELECT id, name, description, status, created_at, updated_at FROM departments \
         WHERE (?1 IS NULL OR LOWER(name) LIKE ?1 ESCAPE '\\' OR LOWER(description) LIKE ?1 ESCAPE '\\') \
           AND (?2 IS NULL OR LOWER(status) = LOWER(?2)) \
         ORDER BY name",
    )
    .bind(filter.pattern())
    .bind(filter.status())
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn find_by_id(pool: &DbPool, id: i64) -> Result<Option<Department>, AppError> {
    let row = sqlx::query_as::<_, Department>(
        "SELECT id, name, description, status, created_at, updated_at FROM departments WHERE id = ?1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

pub async fn create(
    pool: &DbPool,
    name: &str,
    description: &str,
    status: ActiveStatus,
) -> Result<i64, AppError> {
    let id = sqlx::query_scalar(
        "INSERT INTO departments (name, description, status, created_at) VALUES (?1, ?2, ?3, ?4) RETURNING id",
    )
    .bind(name.trim())
    .bind(description.trim())
    .bind(status.as_str())
    .bind(time::now())
    .fetch_one(pool)
    .await
    .map_err(|e| conflict_on_unique(e, DUPLICATE_NAME))?;
    Ok(id)
}

pub async fn update(pool: &DbPool, id: i64, changes: &DepartmentChanges) -> Result<bool, AppError> {
    let result = sqlx::query(
        "UPDATE departments SET \
            name = COALESCE(?1, name), \
            description = COALESCE(?2, description), \
            status = COALESCE(?3, status), \
            updated_at = ?4 \
         WHERE id = ?5",
    )
    .bind(changes.name.as_deref().map(str::trim))
    .bind(changes.description.as_deref().map(str::trim))
    .bind(changes.status.map(ActiveStatus::as_str))
    .bind(time::now())
    .bind(id)
    .execute(pool)
    .await
    .map_err(|e| conflict_on_unique(e, DUPLICATE_NAME))?;
    Ok(result.rows_affected() > 0)
}

pub async fn delete(pool: &DbPool, id: i64) -> Result<bool, AppError> {
    let result = sqlx::query("DELETE FROM departments WHERE id = ?1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
