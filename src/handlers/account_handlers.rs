use actix_session::Session;
use actix_web::{HttpResponse, web};
use serde_json::json;

use crate::auth::session::require_staff;
use crate::auth::validate;
use crate::db::DbPool;
use crate::errors::AppError;
use crate::models::account::{self, AccountChanges, AccountForm, AccountType};
use crate::models::common::{ActiveStatus, ListFilter, non_blank};
use crate::response;

fn not_found() -> AppError {
    AppError::NotFound("Account not found".to_string())
}

/// Parse the optional `type` and `status` fields, collecting bad values into `errors`.
fn parse_enums(
    form: &AccountForm,
    errors: &mut Vec<String>,
) -> (Option<AccountType>, Option<ActiveStatus>) {
    let account_type = non_blank(form.account_type.as_deref())
        .and_then(|t| t.parse::<AccountType>().map_err(|e| errors.push(e)).ok());
    let status = non_blank(form.status.as_deref())
        .and_then(|s| s.parse::<ActiveStatus>().map_err(|e| errors.push(e)).ok());
    (account_type, status)
}

pub async fn list(
    pool: web::Data<DbPool>,
    session: Session,
    filter: web::Query<ListFilter>,
) -> Result<HttpResponse, AppError> {
    require_staff(&session)?;
    let accounts = account::find_all(&pool, &filter).await?;
    Ok(response::success(accounts, "Accounts retrieved successfully"))
}

pub async fn read(
    pool: web::Data<DbPool>,
    session: Session,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    require_staff(&session)?;
    let found = account::find_by_id(&pool, path.into_inner())
        .await?
        .ok_or_else(not_found)?;
    Ok(response::success(found, "Success"))
}

pub async fn create(
    pool: web::Data<DbPool>,
    session: Session,
    body: web::Json<AccountForm>,
) -> Result<HttpResponse, AppError> {
    let actor = require_staff(&session)?;

    let code = body.code.as_deref().unwrap_or_default();
    let name = body.name.as_deref().unwrap_or_default();
    let mut errors: Vec<String> = [
        validate::validate_required(code, "Account code", 20),
        validate::validate_required(name, "Account name", 100),
    ]
    .into_iter()
    .flatten()
    .collect();
    let (account_type, status) = parse_enums(&body, &mut errors);
    if account_type.is_none() && non_blank(body.account_type.as_deref()).is_none() {
        errors.push("Account type is required".to_string());
    }
    let Some(account_type) = account_type.filter(|_| errors.is_empty()) else {
        return Err(AppError::Validation(errors));
    };

    let id = account::create(
        &pool,
        code,
        name,
        account_type,
        status.unwrap_or(ActiveStatus::Active),
    )
    .await?;

    let details = json!({
        "code": code.trim(),
        "summary": format!("Created account {} {}", code.trim(), name.trim())
    });
    let _ = crate::audit::log(&pool, actor.id, "account.created", "account", id, details).await;

    Ok(response::created(json!({ "id": id }), "Account created successfully"))
}

pub async fn update(
    pool: web::Data<DbPool>,
    session: Session,
    path: web::Path<i64>,
    body: web::Json<AccountForm>,
) -> Result<HttpResponse, AppError> {
    let actor = require_staff(&session)?;
    let id = path.into_inner();

    let mut errors = Vec::new();
    if let Some(code) = body.code.as_deref() {
        errors.extend(validate::validate_required(code, "Account code", 20));
    }
    if let Some(name) = body.name.as_deref() {
        errors.extend(validate::validate_required(name, "Account name", 100));
    }
    let (account_type, status) = parse_enums(&body, &mut errors);
    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }

    let changes = AccountChanges {
        code: body.code.clone(),
        name: body.name.clone(),
        account_type,
        status,
    };
    if !account::update(&pool, id, &changes).await? {
        return Err(not_found());
    }

    let details = json!({ "summary": format!("Updated account #{id}") });
    let _ = crate::audit::log(&pool, actor.id, "account.updated", "account", id, details).await;

    Ok(response::success(json!({ "id": id }), "Account updated successfully"))
}

pub async fn delete(
    pool: web::Data<DbPool>,
    session: Session,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let actor = require_staff(&session)?;
    let id = path.into_inner();

    let existing = account::find_by_id(&pool, id).await?.ok_or_else(not_found)?;
    account::delete(&pool, id).await?;

    let details = json!({ "summary": format!("Deleted account {} {}", existing.code, existing.name) });
    let _ = crate::audit::log(&pool, actor.id, "account.deleted", "account", id, details).await;

    Ok(response::success(json!({ "id": id }), "Account deleted successfully"))
}
