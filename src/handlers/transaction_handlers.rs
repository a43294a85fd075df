use actix_session::Session;
use actix_web::{HttpResponse, web};
use serde_json::json;

use crate::auth::session::require_staff;
use crate::db::DbPool;
use crate::errors::AppError;
use crate::models::common::ListFilter;
use crate::models::transaction::{self, TransactionForm};
use crate::response;

fn not_found() -> AppError {
    AppError::NotFound("Transaction not found".to_string())
}

pub async fn list(
    pool: web::Data<DbPool>,
    session: Session,
    filter: web::Query<ListFilter>,
) -> Result<HttpResponse, AppError> {
    require_staff(&session)?;
    let transactions = transaction::find_all(&pool, &filter).await?;
    Ok(response::success(transactions, "Transactions retrieved successfully"))
}

pub async fn read(
    pool: web::Data<DbPool>,
    session: Session,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    require_staff(&session)?;
    let found = transaction::find_by_id(&pool, path.into_inner())
        .await?
        .ok_or_else(not_found)?;
    Ok(response::success(found, "Success"))
}

pub async fn create(
    pool: web::Data<DbPool>,
    session: Session,
    body: web::Json<TransactionForm>,
) -> Result<HttpResponse, AppError> {
    let actor = require_staff(&session)?;
    let input = body.validate().map_err(AppError::Validation)?;

    let id = transaction::create(&pool, &input, actor.id).await?;

    let details = json!({
        "account": input.account,
        "amount": input.amount,
        "summary": format!("Recorded {} of {} to {}", input.txn_type.as_str(), input.amount, input.account)
    });
    let _ = crate::audit::log(&pool, actor.id, "transaction.created", "transaction", id, details).await;

    Ok(response::created(json!({ "id": id }), "Transaction created successfully"))
}

/// PUT replaces the whole record, so the body is validated like a create.
pub async fn update(
    pool: web::Data<DbPool>,
    session: Session,
    path: web::Path<i64>,
    body: web::Json<TransactionForm>,
) -> Result<HttpResponse, AppError> {
    let actor = require_staff(&session)?;
    let id = path.into_inner();
    let input = body.validate().map_err(AppError::Validation)?;

    if !transaction::update(&pool, id, &input).await? {
        return Err(not_found());
    }

    let details = json!({ "summary": format!("Updated transaction #{id}") });
    let _ = crate::audit::log(&pool, actor.id, "transaction.updated", "transaction", id, details).await;

    Ok(response::success(json!({ "id": id }), "Transaction updated successfully"))
}

pub async fn delete(
    pool: web::Data<DbPool>,
    session: Session,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let actor = require_staff(&session)?;
    let id = path.into_inner();

    if !transaction::delete(&pool, id).await? {
        return Err(not_found());
    }

    let details = json!({ "summary": format!("Deleted transaction #{id}") });
    let _ = crate::audit::log(&pool, actor.id, "transaction.deleted", "transaction", id, details).await;

    Ok(response::success(json!({ "id": id }), "Transaction deleted successfully"))
}
