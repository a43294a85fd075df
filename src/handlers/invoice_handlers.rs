use actix_session::Session;
use actix_web::{HttpResponse, web};
use serde::Deserialize;
use serde_json::json;

use crate::auth::session::{self, SessionUser, require_staff};
use crate::db::DbPool;
use crate::errors::AppError;
use crate::models::invoice::{self, InvoiceScope, NewInvoice, PayOutcome};
use crate::response;

#[derive(Debug, Deserialize)]
pub struct PayRequest {
    pub invoice_id: Option<i64>,
}

/// Clients see only their own invoices; staff see every invoice.
fn scope_for(user: &SessionUser) -> InvoiceScope {
    if user.is_staff() {
        InvoiceScope::All
    } else {
        InvoiceScope::Owner(user.id)
    }
}

fn not_found() -> AppError {
    AppError::NotFound("Invoice not found".to_string())
}

pub async fn list(pool: web::Data<DbPool>, session: Session) -> Result<HttpResponse, AppError> {
    let user = session::current(&session)?;
    let invoices = invoice::find_all(&pool, scope_for(&user)).await?;
    Ok(response::success(invoices, "Invoices retrieved successfully"))
}

pub async fn read(
    pool: web::Data<DbPool>,
    session: Session,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let user = session::current(&session)?;
    let detail = invoice::find_by_id(&pool, path.into_inner(), scope_for(&user))
        .await?
        .ok_or_else(not_found)?;
    Ok(response::success(detail, "Success"))
}

/// POST /api/invoices/pay `{invoice_id}`
pub async fn pay(
    pool: web::Data<DbPool>,
    session: Session,
    body: web::Json<PayRequest>,
) -> Result<HttpResponse, AppError> {
    let user = session::current(&session)?;
    let invoice_id = body
        .invoice_id
        .ok_or_else(|| AppError::BadRequest("Invoice ID required".to_string()))?;

    match invoice::pay(&pool, invoice_id, scope_for(&user)).await? {
        PayOutcome::NotFound => Err(not_found()),
        PayOutcome::AlreadyPaid => Err(AppError::Conflict("Invoice is already paid".to_string())),
        PayOutcome::Paid => {
            log::info!("Invoice {invoice_id} paid by '{}'", user.username);
            let details = json!({ "summary": format!("Invoice #{invoice_id} marked as paid") });
            let _ = crate::audit::log(&pool, user.id, "invoice.paid", "invoice", invoice_id, details).await;
            Ok(response::success(
                json!({ "invoice_id": invoice_id }),
                "Invoice marked as paid",
            ))
        }
    }
}

pub async fn create(
    pool: web::Data<DbPool>,
    session: Session,
    body: web::Json<NewInvoice>,
) -> Result<HttpResponse, AppError> {
    let actor = require_staff(&session)?;

    let errors = body.validate();
    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }

    let (invoice_id, number) = invoice::create(&pool, &body).await?;

    let details = json!({
        "invoice_number": number,
        "total": body.total(),
        "summary": format!("Created invoice {number} for {}", body.total())
    });
    let _ = crate::audit::log(&pool, actor.id, "invoice.created", "invoice", invoice_id, details).await;

    Ok(response::created(
        json!({ "invoice_id": invoice_id, "invoice_number": number }),
        "Invoice created successfully",
    ))
}

/// GET /api/invoices/export, CSV of the invoices visible to the caller.
pub async fn export(pool: web::Data<DbPool>, session: Session) -> Result<HttpResponse, AppError> {
    let user = session::current(&session)?;
    let invoices = invoice::find_all(&pool, scope_for(&user)).await?;
    Ok(response::csv_attachment(
        "invoices.csv",
        invoice::invoices_to_csv(&invoices),
    ))
}
