use actix_session::Session;
use actix_web::{HttpResponse, web};
use serde_json::json;

use crate::auth::session::require_staff;
use crate::auth::validate;
use crate::db::DbPool;
use crate::errors::AppError;
use crate::models::common::{ActiveStatus, ListFilter, non_blank};
use crate::models::department::{self, DepartmentChanges, DepartmentForm};
use crate::response;

fn parse_status(raw: Option<&str>) -> Result<Option<ActiveStatus>, AppError> {
    non_blank(raw)
        .map(|s| s.parse::<ActiveStatus>().map_err(AppError::BadRequest))
        .transpose()
}

fn not_found() -> AppError {
    AppError::NotFound("Department not found".to_string())
}

pub async fn list(
    pool: web::Data<DbPool>,
    session: Session,
    filter: web::Query<ListFilter>,
) -> Result<HttpResponse, AppError> {
    require_staff(&session)?;
    let departments = department::find_all(&pool, &filter).await?;
    Ok(response::success(departments, "Departments retrieved successfully"))
}

pub async fn read(
    pool: web::Data<DbPool>,
    session: Session,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    require_staff(&session)?;
    let found = department::find_by_id(&pool, path.into_inner())
        .await?
        .ok_or_else(not_found)?;
    Ok(response::success(found, "Success"))
}

pub async fn create(
    pool: web::Data<DbPool>,
    session: Session,
    body: web::Json<DepartmentForm>,
) -> Result<HttpResponse, AppError> {
    let actor = require_staff(&session)?;

    let name = body.name.as_deref().unwrap_or_default();
    let description = body.description.as_deref().unwrap_or_default();
    let errors: Vec<String> = [
        validate::validate_required(name, "Department name", 100),
        validate::validate_optional(description, "Description", 500),
    ]
    .into_iter()
    .flatten()
    .collect();
    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }
    let status = parse_status(body.status.as_deref())?.unwrap_or(ActiveStatus::Active);

    let id = department::create(&pool, name, description, status).await?;

    let details = json!({ "summary": format!("Created department '{}'", name.trim()) });
    let _ = crate::audit::log(&pool, actor.id, "department.created", "department", id, details).await;

    Ok(response::created(json!({ "id": id }), "Department created successfully"))
}

pub async fn update(
    pool: web::Data<DbPool>,
    session: Session,
    path: web::Path<i64>,
    body: web::Json<DepartmentForm>,
) -> Result<HttpResponse, AppError> {
    let actor = require_staff(&session)?;
    let id = path.into_inner();

    let mut errors = Vec::new();
    if let Some(name) = body.name.as_deref() {
        errors.extend(validate::validate_required(name, "Department name", 100));
    }
    if let Some(desc) = body.description.as_deref() {
        errors.extend(validate::validate_optional(desc, "Description", 500));
    }
    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }

    let changes = DepartmentChanges {
        name: body.name.clone(),
        description: body.description.clone(),
        status: parse_status(body.status.as_deref())?,
    };
    if !department::update(&pool, id, &changes).await? {
        return Err(not_found());
    }

    let details = json!({ "summary": format!("Updated department #{id}") });
    let _ = crate::audit::log(&pool, actor.id, "department.updated", "department", id, details).await;

    Ok(response::success(json!({ "id": id }), "Department updated successfully"))
}

pub async fn delete(
    pool: web::Data<DbPool>,
    session: Session,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let actor = require_staff(&session)?;
    let id = path.into_inner();

    let existing = department::find_by_id(&pool, id).await?.ok_or_else(not_found)?;
    department::delete(&pool, id).await?;

    let details = json!({ "summary": format!("Deleted department '{}'", existing.name) });
    let _ = crate::audit::log(&pool, actor.id, "department.deleted", "department", id, details).await;

    Ok(response::success(json!({ "id": id }), "Department deleted successfully"))
}
