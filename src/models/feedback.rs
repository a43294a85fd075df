use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::auth::validate;
use crate::db::DbPool;
use crate::errors::AppError;
use crate::time;

/// Ratings at or above this count as satisfied.
pub const SATISFIED_RATING: i64 = 4;

#[derive(Debug, Clone, Default, PartialEq, Serialize, sqlx::FromRow)]
pub struct FeedbackStats {
    pub total_feedback: i64,
    pub satisfied_clients: i64,
    pub average_rating: f64,
    pub compliance_rate: i64,
}

#[derive(Debug, Default, Deserialize)]
pub struct FeedbackForm {
    pub name: Option<String>,
    pub email: Option<String>,
    pub rating: Option<Value>,
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewFeedback {
    pub name: String,
    pub email: Option<String>,
    pub rating: i64,
    pub message: String,
}

/// Integer part of a numeric rating, given as a number or a string.
fn rating_value(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().filter(|f| f.is_finite()).map(|f| f.trunc() as i64))
        }
        _ => None,
    }
}

impl FeedbackForm {
    pub fn validate(&self) -> Result<NewFeedback, String> {
        let (Some(name), Some(rating), Some(message)) = (&self.name, &self.rating, &self.message) else {
            return Err("Missing required fields".to_string());
        };

        let name = name.trim();
        let message = message.trim();
        if name.is_empty() || message.is_empty() {
            return Err("Name and message cannot be empty".to_string());
        }

        let rating = rating_value(rating)
            .filter(|r| (1..=5).contains(r))
            .ok_or_else(|| "Rating must be between 1 and 5".to_string())?;

        let email = self
            .email
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty());
        if let Some(email) = email {
            if !validate::is_valid_email(email) {
                return Err("Invalid email format".to_string());
            }
        }

        Ok(NewFeedback {
            name: name.to_string(),
            email: email.map(String::from),
            rating,
            message: message.to_string(),
        })
    }
}

pub async fn stats(pool: &DbPool) -> Result<FeedbackStats, AppError> {
    let stats = sqlx::query_as::<_, FeedbackStats>(
        "SELECT total_feedback, satisfied_clients, average_rating, compliance_rate \
         FROM feedback_stats WHERE id = 1",
    )
    .fetch_optional(pool)
    .await?;
    Ok(stats.unwrap_or_default())
}

/// Store the feedback and fold it into the running statistics in one transaction.
pub async fn submit(
    pool: &DbPool,
    feedback: &NewFeedback,
    ip_address: Option<&str>,
    user_agent: Option<&str>,
) -> Result<(i64, FeedbackStats), AppError> {
    let mut tx = pool.begin().await?;

    let feedback_id: i64 = sqlx::query_scalar(
        "INSERT INTO feedback (name, email, rating, message, ip_address, user_agent, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7) RETURNING id",
    )
    .bind(&feedback.name)
    .bind(feedback.email.as_deref())
    .bind(feedback.rating)
    .bind(&feedback.message)
    .bind(ip_address)
    .bind(user_agent)
    .bind(time::now())
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query(
        "INSERT OR IGNORE INTO feedback_stats \
         (id, total_feedback, satisfied_clients, average_rating, compliance_rate) \
         VALUES (1, 0, 0, 0.0, 0)",
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        "UPDATE feedback_stats SET \
            total_feedback = total_feedback + 1, \
            satisfied_clients = satisfied_clients + CASE WHEN ?1 >= ?2 THEN 1 ELSE 0 END, \
            average_rating = (SELECT ROUND(AVG(rating), 2) FROM feedback), \
            compliance_rate = CASE WHEN ?1 >= ?2 THEN MIN(100, compliance_rate + 1) ELSE compliance_rate END \
         WHERE id = 1",
    )
    .bind(feedback.rating)
    .bind(SATISFIED_RATING)
    .execute(&mut *tx)
    .await?;

    let stats = sqlx::query_as::<_, FeedbackStats>(
        "SELECT total_feedback, satisfied_clients, average_rating, compliance_rate \
         FROM feedback_stats WHERE id = 1",
    )
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok((feedback_id, stats))
}
