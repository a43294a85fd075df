pub mod helpers;

use actix_session::Session;
use actix_web::{HttpResponse, web};
use serde_json::json;

use crate::auth::password;
use crate::auth::session::require_staff;
use crate::db::DbPool;
use crate::errors::AppError;
use crate::models::user::{self, NewUser, Role, UserChanges, UserStatus};
use crate::response::{self, Pagination};
use helpers::{ListQuery, UserRequest, provided};

/// GET /api/users?page=&limit=&search=
pub async fn list(
    pool: web::Data<DbPool>,
    session: Session,
    query: web::Query<ListQuery>,
) -> Result<HttpResponse, AppError> {
    require_staff(&session)?;

    let page = query.page.unwrap_or(1).max(1);
    let per_page = query.limit.unwrap_or(10).clamp(1, 100);
    let search = query.search.as_deref().unwrap_or("");

    let user_page = user::find_paginated(&pool, page, per_page, search).await?;
    let pagination = Pagination::new(user_page.total_count, user_page.page, user_page.per_page);

    Ok(response::paginated(user_page.users, pagination, "Users retrieved successfully"))
}

/// GET /api/users/{id}
pub async fn read(
    pool: web::Data<DbPool>,
    session: Session,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    require_staff(&session)?;

    let found = user::find_display_by_id(&pool, path.into_inner())
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
    Ok(response::success(found, "Success"))
}

/// POST /api/users
pub async fn create(
    pool: web::Data<DbPool>,
    session: Session,
    body: web::Json<UserRequest>,
) -> Result<HttpResponse, AppError> {
    let actor = require_staff(&session)?;

    if let Some(msg) = helpers::missing_required(&body) {
        return Err(AppError::BadRequest(msg));
    }
    let errors = helpers::validate_user_fields(&body);
    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }

    let role = helpers::parse_role(provided(&body.role))?.unwrap_or(Role::Client);
    let status = helpers::parse_status(provided(&body.status))?.unwrap_or(UserStatus::Active);
    helpers::ensure_can_assign(&actor, Some(role))?;

    let username = body.username.clone().unwrap_or_default();
    let email = body.email.clone().unwrap_or_default();
    if user::username_or_email_taken(&pool, &username, &email, None).await? {
        return Err(AppError::Conflict("Username or email already exists".to_string()));
    }

    let new_user = NewUser {
        username,
        email,
        password: password::hash_password(body.password.as_deref().unwrap_or_default())?,
        full_name: body.full_name.clone().unwrap_or_default(),
        role,
        status,
    };
    let user_id = user::create(&pool, &new_user).await?;

    let details = json!({
        "email": new_user.email,
        "role": role.as_str(),
        "summary": format!("Created user '{}'", new_user.username)
    });
    let _ = crate::audit::log(&pool, actor.id, "user.created", "user", user_id, details).await;

    Ok(response::created(json!({ "user_id": user_id }), "User created successfully"))
}

/// PUT /api/users/{id}
pub async fn update(
    pool: web::Data<DbPool>,
    session: Session,
    path: web::Path<i64>,
    body: web::Json<UserRequest>,
) -> Result<HttpResponse, AppError> {
    let actor = require_staff(&session)?;
    let user_id = path.into_inner();

    let existing = user::find_by_id(&pool, user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    let errors = helpers::validate_user_fields(&body);
    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }

    let role = helpers::parse_role(provided(&body.role))?;
    helpers::ensure_can_assign(&actor, role)?;
    if existing.role() == Role::Admin && actor.role != Role::Admin {
        return Err(AppError::PermissionDenied(format!(
            "{} may not modify an Admin account",
            actor.username
        )));
    }

    let changes = UserChanges {
        username: provided(&body.username).map(String::from),
        email: provided(&body.email).map(String::from),
        full_name: provided(&body.full_name).map(String::from),
        role,
        status: helpers::parse_status(provided(&body.status))?,
        password: match provided(&body.password) {
            Some(pw) => Some(password::hash_password(pw)?),
            None => None,
        },
    };
    if changes.is_empty() {
        return Err(AppError::BadRequest("No valid fields to update".to_string()));
    }

    let username = changes.username.as_deref().unwrap_or(&existing.username);
    let email = changes.email.as_deref().unwrap_or(&existing.email);
    if user::username_or_email_taken(&pool, username, email, Some(user_id)).await? {
        return Err(AppError::Conflict("Username or email already exists".to_string()));
    }

    if !user::update(&pool, user_id, &changes).await? {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    let details = json!({
        "password_changed": changes.password.is_some(),
        "summary": format!("Updated user '{}'", username)
    });
    let _ = crate::audit::log(&pool, actor.id, "user.updated", "user", user_id, details).await;

    Ok(response::success(json!({ "user_id": user_id }), "User updated successfully"))
}

/// DELETE /api/users/{id}. Soft delete.
pub async fn delete(
    pool: web::Data<DbPool>,
    session: Session,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let actor = require_staff(&session)?;
    let user_id = path.into_inner();

    if user_id == actor.id {
        return Err(AppError::BadRequest("You cannot delete your own account".to_string()));
    }

    let existing = user::find_by_id(&pool, user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
    if existing.role() == Role::Admin && actor.role != Role::Admin {
        return Err(AppError::PermissionDenied(format!(
            "{} may not delete an Admin account",
            actor.username
        )));
    }

    user::soft_delete(&pool, user_id).await?;

    let details = json!({ "summary": format!("Deleted user '{}'", existing.username) });
    let _ = crate::audit::log(&pool, actor.id, "user.deleted", "user", user_id, details).await;

    Ok(response::success(json!({ "user_id": user_id }), "User deleted successfully"))
}
