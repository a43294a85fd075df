use serde::Serialize;
use serde_json::Value;

use crate::db::DbPool;
use crate::errors::AppError;
use crate::time;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct AuditEntry {
    pub action: String,
    pub timestamp: String,
    pub full_name: Option<String>,
    pub username: Option<String>,
}

/// Record an action. Callers ignore the result; failures are logged here.
pub async fn log(
    pool: &DbPool,
    user_id: i64,
    action: &str,
    target_type: &str,
    target_id: i64,
    details: Value,
) -> Result<(), AppError> {
    let user_id = (user_id > 0).then_some(user_id);
    let result = sqlx::query(
        "INSERT INTO audit_logs (user_id, action, target_type, target_id, details, timestamp) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )
    .bind(user_id)
    .bind(action)
    .bind(target_type)
    .bind(target_id)
    .bind(details.to_string())
    .bind(time::now())
    .execute(pool)
    .await;

    match result {
        Ok(_) => Ok(()),
        Err(e) => {
            log::error!("Failed to write audit entry '{action}': {e}");
            Err(AppError::Db(e))
        }
    }
}

/// Most recent entries, newest first. `action` is the human summary when one
/// was recorded in the details.
pub async fn find_recent(pool: &DbPool, limit: i64) -> Result<Vec<AuditEntry>, AppError> {
    let entries = sqlx::query_as::<_, AuditEntry>(
        "SELECT COALESCE(json_extract(a.details, '$.summary'), a.action) AS action, \
                a.timestamp, u.full_name, u.username \
         FROM audit_logs a \
         LEFT JOIN users u ON u.id = a.user_id \
         ORDER BY a.timestamp DESC, a.id DESC \
         LIMIT ?1",
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;
    Ok(entries)
}

/// Delete entries older than `retention_days`. Returns the number removed.
pub async fn cleanup_old_entries(pool: &DbPool, retention_days: i64) -> Result<u64, AppError> {
    let cutoff = time::days_ago(retention_days);
    let removed = sqlx::query("DELETE FROM audit_logs WHERE timestamp < ?1")
        .bind(cutoff)
        .execute(pool)
        .await?
        .rows_affected();
    if removed > 0 {
        log::info!("Removed {removed} audit entries older than {retention_days} days");
    }
    Ok(removed)
}
