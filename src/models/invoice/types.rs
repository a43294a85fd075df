use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::auth::validate;
use crate::models::money::Money;
use crate::response::escape_csv;
use crate::time;

/// Invoice header joined with the client's company details.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Invoice {
    #[sqlx(rename = "id")]
    pub invoice_id: i64,
    pub invoice_number: String,
    pub client_id: Option<i64>,
    pub client_user_id: i64,
    pub company_name: Option<String>,
    pub contact_person: Option<String>,
    pub description: String,
    #[sqlx(rename = "amount_cents", try_from = "i64")]
    pub amount: Money,
    #[sqlx(rename = "tax_cents", try_from = "i64")]
    pub tax_amount: Money,
    #[sqlx(rename = "total_cents", try_from = "i64")]
    pub total_amount: Money,
    pub status: String,
    pub due_date: String,
    pub created_date: String,
    pub paid_date: Option<String>,
}

impl Invoice {
    /// Replace the stored status with what the client should see today.
    pub fn with_effective_status(mut self, today: NaiveDate) -> Self {
        self.status = effective_status(&self.status, &self.due_date, today).to_string();
        self
    }
}

/// A pending invoice whose due date has passed is overdue.
pub fn effective_status<'a>(status: &'a str, due_date: &str, today: NaiveDate) -> &'a str {
    match time::parse_date(due_date) {
        Some(due) if status == "Pending" && due < today => "Overdue",
        _ => status,
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct InvoiceItem {
    pub description: String,
    pub quantity: i64,
    #[sqlx(rename = "unit_price_cents", try_from = "i64")]
    pub unit_price: Money,
    #[sqlx(rename = "total_cents", try_from = "i64")]
    pub total_amount: Money,
}

#[derive(Debug, Clone, Serialize)]
pub struct InvoiceDetail {
    #[serde(flatten)]
    pub invoice: Invoice,
    pub items: Vec<InvoiceItem>,
}

/// Which invoices a caller may see.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvoiceScope {
    Owner(i64),
    All,
}

impl InvoiceScope {
    /// Bound parameter for `(?N IS NULL OR client_user_id = ?N)`.
    pub fn owner(self) -> Option<i64> {
        match self {
            InvoiceScope::Owner(id) => Some(id),
            InvoiceScope::All => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayOutcome {
    Paid,
    AlreadyPaid,
    NotFound,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewInvoiceItem {
    pub description: String,
    #[serde(default = "one")]
    pub quantity: i64,
    pub unit_price: Money,
}

fn one() -> i64 {
    1
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewInvoice {
    pub client_user_id: i64,
    #[serde(default)]
    pub client_id: Option<i64>,
    #[serde(default)]
    pub description: String,
    pub due_date: String,
    #[serde(default)]
    pub tax_amount: Money,
    #[serde(default)]
    pub items: Vec<NewInvoiceItem>,
}

impl NewInvoice {
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        errors.extend(validate::validate_date(&self.due_date, "Due date"));
        errors.extend(validate::validate_optional(&self.description, "Description", 255));
        if self.items.is_empty() {
            errors.push("At least one line item is required".to_string());
        }
        for (i, item) in self.items.iter().enumerate() {
            let n = i + 1;
            if item.description.trim().is_empty() {
                errors.push(format!("Item {n}: description is required"));
            }
            if item.quantity < 1 {
                errors.push(format!("Item {n}: quantity must be at least 1"));
            }
            if !item.unit_price.is_positive() {
                errors.push(format!("Item {n}: unit price must be greater than 0"));
            } else if item.unit_price.exceeds_max() {
                errors.push(format!("Item {n}: unit price is too large"));
            }
        }
        if self.tax_amount.cents() < 0 {
            errors.push("Tax amount cannot be negative".to_string());
        }
        if errors.is_empty() && self.checked_total().is_none_or(Money::exceeds_max) {
            errors.push("Invoice total is too large".to_string());
        }
        errors
    }

    /// Total without saturation; `None` on overflow.
    pub fn checked_total(&self) -> Option<Money> {
        self.items
            .iter()
            .try_fold(self.tax_amount, |acc, i| acc.checked_add(i.unit_price.checked_times(i.quantity)?))
    }

    /// Sum of quantity times unit price over all items.
    pub fn amount(&self) -> Money {
        self.items.iter().map(|i| i.unit_price.times(i.quantity)).sum()
    }

    pub fn total(&self) -> Money {
        self.amount() + self.tax_amount
    }
}

pub fn format_invoice_number(year: i32, seq: i64) -> String {
    format!("INV-{year}-{seq:03}")
}

pub fn invoices_to_csv(invoices: &[Invoice]) -> String {
    let mut csv = String::from("Invoice Number,Description,Amount,Status,Due Date,Created Date\n");
    for inv in invoices {
        csv.push_str(&format!(
            "{},{},{},{},{},{}\n",
            escape_csv(&inv.invoice_number),
            escape_csv(&inv.description),
            inv.total_amount,
            escape_csv(&inv.status),
            escape_csv(&inv.due_date),
            escape_csv(&inv.created_date),
        ));
    }
    csv
}
