use serde::{Deserialize, Serialize};

use crate::db::DbPool;
use crate::errors::AppError;
use crate::time;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Client {
    pub id: i64,
    pub user_id: Option<i64>,
    pub company_name: String,
    pub contact_person: String,
    pub email: String,
    pub created_at: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ClientForm {
    pub company_name: Option<String>,
    pub contact_person: Option<String>,
    pub email: Option<String>,
    pub user_id: Option<i64>,
}

pub async fn find_all(pool: &DbPool) -> Result<Vec<Client>, AppError> {
    let rows = sqlx::query_as::<_, Client>(
        "SELECT id, user_id, company_name, contact_person, email, created_at \
         FROM clients ORDER BY company_name",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn create(pool: &DbPool, form: &ClientForm) -> Result<i64, AppError> {
    let trimmed = |v: &Option<String>| v.as_deref().map(str::trim).unwrap_or("").to_string();
    let id = sqlx::query_scalar(
        "INSERT INTO clients (user_id, company_name, contact_person, email, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5) RETURNING id",
    )
    .bind(form.user_id)
    .bind(trimmed(&form.company_name))
    .bind(trimmed(&form.contact_person))
    .bind(trimmed(&form.email))
    .bind(time::now())
    .fetch_one(pool)
    .await?;
    Ok(id)
}

pub async fn count(pool: &DbPool) -> Result<i64, AppError> {
    let count = sqlx::query_scalar("SELECT COUNT(*) FROM clients")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

pub async fn count_created_since(pool: &DbPool, since: &str) -> Result<i64, AppError> {
    let count = sqlx::query_scalar("SELECT COUNT(*) FROM clients WHERE created_at >= ?1")
        .bind(since)
        .fetch_one(pool)
        .await?;
    Ok(count)
}
