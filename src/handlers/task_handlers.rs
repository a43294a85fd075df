use actix_session::Session;
use actix_web::{HttpResponse, web};
use serde_json::json;

use crate::auth::session::{self, require_staff};
use crate::auth::validate;
use crate::db::DbPool;
use crate::errors::AppError;
use crate::models::common::non_blank;
use crate::models::task::{self, TaskForm, TaskStatus};
use crate::models::user::{self, UserStatus};
use crate::response;

/// Staff see every task; anyone else sees the tasks assigned to them.
pub async fn list(pool: web::Data<DbPool>, session: Session) -> Result<HttpResponse, AppError> {
    let user = session::current(&session)?;
    let assignee = (!user.is_staff()).then_some(user.id);
    let tasks = task::find_all(&pool, assignee).await?;
    Ok(response::success(tasks, "Tasks retrieved successfully"))
}

pub async fn create(
    pool: web::Data<DbPool>,
    session: Session,
    body: web::Json<TaskForm>,
) -> Result<HttpResponse, AppError> {
    let actor = require_staff(&session)?;

    let title = body.title.as_deref().unwrap_or_default();
    let description = body.description.as_deref().unwrap_or_default();
    let due_date = non_blank(body.due_date.as_deref());
    let errors: Vec<String> = [
        validate::validate_required(title, "Title", 200),
        validate::validate_optional(description, "Description", 1000),
        due_date.and_then(|d| validate::validate_date(d, "Due date")),
    ]
    .into_iter()
    .flatten()
    .collect();
    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }

    if let Some(assignee) = body.assigned_to {
        let active = user::find_by_id(&pool, assignee)
            .await?
            .is_some_and(|u| u.status != UserStatus::Deleted.as_str());
        if !active {
            return Err(AppError::BadRequest("Assigned user not found".to_string()));
        }
    }

    let id = task::create(&pool, title, description, body.assigned_to, due_date).await?;

    let details = json!({
        "assigned_to": body.assigned_to,
        "summary": format!("Created task '{}'", title.trim())
    });
    let _ = crate::audit::log(&pool, actor.id, "task.created", "task", id, details).await;

    Ok(response::created(json!({ "id": id }), "Task created successfully"))
}

/// PUT /api/tasks/{id}: staff may edit any task, an assignee only their own.
pub async fn update(
    pool: web::Data<DbPool>,
    session: Session,
    path: web::Path<i64>,
    body: web::Json<TaskForm>,
) -> Result<HttpResponse, AppError> {
    let user = session::current(&session)?;
    let id = path.into_inner();

    let existing = task::find_by_id(&pool, id)
        .await?
        .filter(|t| user.is_staff() || t.assigned_to == Some(user.id))
        .ok_or_else(|| AppError::NotFound("Task not found".to_string()))?;

    let title = body.title.as_deref();
    if let Some(err) = title.and_then(|t| validate::validate_required(t, "Title", 200)) {
        return Err(AppError::Validation(vec![err]));
    }
    let status = non_blank(body.status.as_deref())
        .map(|s| s.parse::<TaskStatus>().map_err(AppError::BadRequest))
        .transpose()?;
    if title.is_none() && status.is_none() {
        return Err(AppError::BadRequest("No valid fields to update".to_string()));
    }

    task::update(&pool, id, title, status).await?;

    let details = json!({
        "status": status.map(TaskStatus::as_str),
        "summary": format!("Updated task '{}'", title.unwrap_or(existing.title.as_str()).trim())
    });
    let _ = crate::audit::log(&pool, user.id, "task.updated", "task", id, details).await;

    Ok(response::success(json!({ "id": id }), "Task updated successfully"))
}
