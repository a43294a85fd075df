use chrono::Datelike;

use crate::db::DbPool;
use crate::errors::AppError;
use crate::time;
use super::types::*;

const SELECT_INVOICE: &str = "\
    SELECT i.id, i.invoice_number, i.client_id, i.client_user_id, \
           c.company_name, c.contact_person, i.description, \
           i.amount_cents, i.tax_cents, i.total_cents, i.status, \
           i.due_date, i.created_date, i.paid_date \
    FROM invoices i \
    LEFT JOIN clients c ON c.id = i.client_id";

fn today() -> chrono::NaiveDate {
    chrono::Local::now().date_naive()
}

/// Invoices visible in `scope`, newest first, with effective status applied.
pub async fn find_all(pool: &DbPool, scope: InvoiceScope) -> Result<Vec<Invoice>, AppError> {
    let rows = sqlx::query_as::<_, Invoice>(&format!(
        "{SELECT_INVOICE} WHERE (?1 IS NULL OR i.client_user_id = ?1) \
         ORDER BY i.created_date DESC, i.id DESC"
    ))
    .bind(scope.owner())
    .fetch_all(pool)
    .await?;
    let today = today();
    Ok(rows.into_iter().map(|i| i.with_effective_status(today)).collect())
}

pub async fn find_by_id(
    pool: &DbPool,
    id: i64,
    scope: InvoiceScope,
) -> Result<Option<InvoiceDetail>, AppError> {
    let invoice = sqlx::query_as::<_, Invoice>(&format!(
        "{SELECT_INVOICE} WHERE i.id = ?1 AND (?2 IS NULL OR i.client_user_id = ?2)"
    ))
    .bind(id)
    .bind(scope.owner())
    .fetch_optional(pool)
    .await?;

    let Some(invoice) = invoice else {
        return Ok(None);
    };

    let items = sqlx::query_as::<_, InvoiceItem>(
        "SELECT description, quantity, unit_price_cents, total_cents \
         FROM invoice_items WHERE invoice_id = ?1 ORDER BY id",
    )
    .bind(id)
    .fetch_all(pool)
    .await?;

    Ok(Some(InvoiceDetail {
        invoice: invoice.with_effective_status(today()),
        items,
    }))
}

/// Mark an invoice paid if it is visible in `scope` and not already paid.
pub async fn pay(pool: &DbPool, id: i64, scope: InvoiceScope) -> Result<PayOutcome, AppError> {
    let mut tx = pool.begin().await?;

    let status: Option<String> = sqlx::query_scalar(
        "SELECT status FROM invoices WHERE id = ?1 AND (?2 IS NULL OR client_user_id = ?2)",
    )
    .bind(id)
    .bind(scope.owner())
    .fetch_optional(&mut *tx)
    .await?;

    let outcome = match status.as_deref() {
        None => PayOutcome::NotFound,
        Some("Paid") => PayOutcome::AlreadyPaid,
        Some(_) => {
            sqlx::query("UPDATE invoices SET status = 'Paid', paid_date = ?1 WHERE id = ?2")
                .bind(time::now())
                .bind(id)
                .execute(&mut *tx)
                .await?;
            PayOutcome::Paid
        }
    };

    tx.commit().await?;
    Ok(outcome)
}

/// Insert an invoice with its line items. Returns the id and invoice number.
pub async fn create(pool: &DbPool, new: &NewInvoice) -> Result<(i64, String), AppError> {
    let year = chrono::Local::now().year();
    let prefix = format!("INV-{year}-");
    let mut tx = pool.begin().await?;

    let client_exists: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM users WHERE id = ?1 AND status != 'deleted'",
    )
    .bind(new.client_user_id)
    .fetch_one(&mut *tx)
    .await?;
    if client_exists == 0 {
        return Err(AppError::BadRequest("Client user not found".to_string()));
    }

    if let Some(client_id) = new.client_id {
        let matches: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM clients WHERE id = ?1 AND (user_id IS NULL OR user_id = ?2)",
        )
        .bind(client_id)
        .bind(new.client_user_id)
        .fetch_one(&mut *tx)
        .await?;
        if matches == 0 {
            return Err(AppError::BadRequest("Client not found for this user".to_string()));
        }
    }

    let last_seq: Option<i64> = sqlx::query_scalar(
        "SELECT MAX(CAST(substr(invoice_number, ?2) AS INTEGER)) FROM invoices \
         WHERE invoice_number LIKE ?1 || '%'",
    )
    .bind(&prefix)
    .bind(prefix.len() as i64 + 1)
    .fetch_one(&mut *tx)
    .await?;
    let number = format_invoice_number(year, last_seq.unwrap_or(0) + 1);

    let amount = new.amount();
    let invoice_id: i64 = sqlx::query_scalar(
        "INSERT INTO invoices (invoice_number, client_id, client_user_id, description, amount_cents, \
         tax_cents, total_cents, status, due_date, created_date) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 'Pending', ?8, ?9) RETURNING id",
    )
    .bind(&number)
    .bind(new.client_id)
    .bind(new.client_user_id)
    .bind(new.description.trim())
    .bind(amount.cents())
    .bind(new.tax_amount.cents())
    .bind(new.total().cents())
    .bind(new.due_date.trim())
    .bind(time::today())
    .fetch_one(&mut *tx)
    .await?;

    for item in &new.items {
        sqlx::query(
            "INSERT INTO invoice_items (invoice_id, description, quantity, unit_price_cents, total_cents) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(invoice_id)
        .bind(item.description.trim())
        .bind(item.quantity)
        .bind(item.unit_price.cents())
        .bind(item.unit_price.times(item.quantity).cents())
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok((invoice_id, number))
}
