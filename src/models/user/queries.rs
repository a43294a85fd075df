use crate::db::DbPool;
use crate::errors::{AppError, conflict_on_unique};
use crate::models::common::contains_pattern;
use crate::time;
use super::types::*;

const SELECT_USER_DISPLAY: &str = "\
    SELECT id, username, email, full_name, role, status, created_at, updated_at, last_login \
    FROM users";

const DUPLICATE_USER: &str = "Username or email already exists";

/// Non-deleted users, newest first, optionally filtered by a case-insensitive
/// substring of username, email or full name.
pub async fn find_paginated(
    pool: &DbPool,
    page: i64,
    per_page: i64,
    search: &str,
) -> Result<UserPage, AppError> {
    let page = page.max(1);
    let per_page = per_page.clamp(1, 100);
    let offset = (page - 1) * per_page;
    let pattern = contains_pattern(search);

    let where_clause = "status != 'deleted' AND (?1 = '%%' \
         OR LOWER(username) LIKE ?1 ESCAPE '\\' OR LOWER(email) LIKE ?1 ESCAPE '\\' \
         OR LOWER(full_name) LIKE ?1 ESCAPE '\\')";

    let total_count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM users WHERE {where_clause}"))
        .bind(&pattern)
        .fetch_one(pool)
        .await?;

    let users = sqlx::query_as::<_, UserDisplay>(&format!(
        "{SELECT_USER_DISPLAY} WHERE {where_clause} ORDER BY created_at DESC, id DESC LIMIT ?2 OFFSET ?3"
    ))
    .bind(&pattern)
    .bind(per_page)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    Ok(UserPage { users, page, per_page, total_count })
}

pub async fn find_display_by_id(pool: &DbPool, id: i64) -> Result<Option<UserDisplay>, AppError> {
    let user = sqlx::query_as::<_, UserDisplay>(&format!("{SELECT_USER_DISPLAY} WHERE id = ?1"))
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(user)
}

pub async fn find_by_id(pool: &DbPool, id: i64) -> Result<Option<User>, AppError> {
    let user = sqlx::query_as::<_, User>(
        "SELECT id, username, email, password, full_name, role, status FROM users WHERE id = ?1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(user)
}

/// Look up a login name. Anything containing '@' is matched against email.
pub async fn find_by_login(pool: &DbPool, login: &str) -> Result<Option<User>, AppError> {
    let column = if login.contains('@') { "email" } else { "username" };
    let user = sqlx::query_as::<_, User>(&format!(
        "SELECT id, username, email, password, full_name, role, status FROM users WHERE {column} = ?1"
    ))
    .bind(login.trim())
    .fetch_optional(pool)
    .await?;
    Ok(user)
}

pub async fn username_or_email_taken(
    pool: &DbPool,
    username: &str,
    email: &str,
    exclude_id: Option<i64>,
) -> Result<bool, AppError> {
    let matches: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM users WHERE (username = ?1 OR email = ?2) AND id != ?3",
    )
    .bind(username.trim())
    .bind(email.trim())
    .bind(exclude_id.unwrap_or(0))
    .fetch_one(pool)
    .await?;
    Ok(matches > 0)
}

pub async fn create(pool: &DbPool, new: &NewUser) -> Result<i64, AppError> {
    let id: i64 = sqlx::query_scalar(
        "INSERT INTO users (username, email, password, full_name, role, status, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7) RETURNING id",
    )
    .bind(new.username.trim())
    .bind(new.email.trim())
    .bind(&new.password)
    .bind(new.full_name.trim())
    .bind(new.role.as_str())
    .bind(new.status.as_str())
    .bind(time::now())
    .fetch_one(pool)
    .await
    .map_err(|e| conflict_on_unique(e, DUPLICATE_USER))?;
    Ok(id)
}

/// Apply a partial update. Returns false when the user does not exist.
pub async fn update(pool: &DbPool, id: i64, changes: &UserChanges) -> Result<bool, AppError> {
    let result = sqlx::query(
        "UPDATE users SET \
            username = COALESCE(?1, username), \
            email = COALESCE(?2, email), \
            full_name = COALESCE(?3, full_name), \
            role = COALESCE(?4, role), \
            status = COALESCE(?5, status), \
            password = COALESCE(?6, password), \
            updated_at = ?7 \
         WHERE id = ?8",
    )
    .bind(changes.username.as_deref().map(str::trim))
    .bind(changes.email.as_deref().map(str::trim))
    .bind(changes.full_name.as_deref().map(str::trim))
    .bind(changes.role.map(Role::as_str))
    .bind(changes.status.map(UserStatus::as_str))
    .bind(changes.password.as_deref())
    .bind(time::now())
    .bind(id)
    .execute(pool)
    .await
    .map_err(|e| conflict_on_unique(e, DUPLICATE_USER))?;
    Ok(result.rows_affected() > 0)
}

pub async fn soft_delete(pool: &DbPool, id: i64) -> Result<bool, AppError> {
    let result = sqlx::query("UPDATE users SET status = 'deleted', updated_at = ?1 WHERE id = ?2")
        .bind(time::now())
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn touch_last_login(pool: &DbPool, id: i64) -> Result<(), AppError> {
    sqlx::query("UPDATE users SET last_login = ?1 WHERE id = ?2")
        .bind(time::now())
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn count_active(pool: &DbPool) -> Result<i64, AppError> {
    let count = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE status = 'active'")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

pub async fn count_created_since(pool: &DbPool, since: &str) -> Result<i64, AppError> {
    let count = sqlx::query_scalar(
        "SELECT COUNT(*) FROM users WHERE status = 'active' AND created_at >= ?1",
    )
    .bind(since)
    .fetch_one(pool)
    .await?;
    Ok(count)
}
