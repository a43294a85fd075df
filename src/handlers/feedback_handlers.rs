use actix_web::{HttpRequest, HttpResponse, http::header, web};
use serde_json::json;

use crate::db::DbPool;
use crate::errors::AppError;
use crate::models::feedback::{self, FeedbackForm};
use crate::response;
use super::auth_handlers::client_ip;

/// GET /api/feedback (public)
pub async fn stats(pool: web::Data<DbPool>) -> Result<HttpResponse, AppError> {
    let stats = feedback::stats(&pool).await?;
    Ok(response::success(json!({ "stats": stats }), "Success"))
}

/// POST /api/feedback (public)
pub async fn submit(
    req: HttpRequest,
    pool: web::Data<DbPool>,
    body: web::Json<FeedbackForm>,
) -> Result<HttpResponse, AppError> {
    let new = body.validate().map_err(AppError::BadRequest)?;

    let ip = client_ip(&req).to_string();
    let user_agent = req
        .headers()
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok());

    let (feedback_id, stats) = feedback::submit(&pool, &new, Some(&ip), user_agent).await?;
    log::info!("Feedback #{feedback_id} received (rating {})", new.rating);

    let details = json!({
        "rating": new.rating,
        "summary": format!("Feedback received from {}", new.name)
    });
    let _ = crate::audit::log(&pool, 0, "feedback.submitted", "feedback", feedback_id, details).await;

    Ok(response::success(
        json!({ "feedback_id": feedback_id, "stats": stats }),
        "Thank you for your feedback!",
    ))
}
