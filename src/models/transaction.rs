use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;

use crate::auth::validate;
use crate::db::DbPool;
use crate::errors::AppError;
use crate::time;
use super::common::ListFilter;
use super::money::Money;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxnType {
    Debit,
    Credit,
}

impl TxnType {
    pub fn as_str(self) -> &'static str {
        match self {
            TxnType::Debit => "Debit",
            TxnType::Credit => "Credit",
        }
    }
}

impl FromStr for TxnType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "debit" => Ok(TxnType::Debit),
            "credit" => Ok(TxnType::Credit),
            _ => Err("Type must be Debit or Credit".to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxnStatus {
    Posted,
    Draft,
}

impl TxnStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TxnStatus::Posted => "Posted",
            TxnStatus::Draft => "Draft",
        }
    }
}

impl FromStr for TxnStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "posted" => Ok(TxnStatus::Posted),
            "draft" => Ok(TxnStatus::Draft),
            _ => Err("Status must be Posted or Draft".to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Transaction {
    pub id: i64,
    #[sqlx(rename = "txn_date")]
    pub date: String,
    pub account: String,
    pub description: String,
    #[serde(rename = "type")]
    pub txn_type: String,
    #[sqlx(rename = "amount_cents", try_from = "i64")]
    pub amount: Money,
    pub status: String,
    pub created_by: Option<i64>,
    pub created_at: String,
    pub updated_at: Option<String>,
}

/// Raw request body. Amount may arrive as a number or a numeric string.
#[derive(Debug, Default, Deserialize)]
pub struct TransactionForm {
    pub date: Option<String>,
    pub account: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub txn_type: Option<String>,
    pub amount: Option<Value>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransactionInput {
    pub date: String,
    pub account: String,
    pub description: String,
    pub txn_type: TxnType,
    pub amount: Money,
    pub status: TxnStatus,
}

fn parse_amount(value: Option<&Value>) -> Option<Money> {
    let amount = match value? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    Money::from_decimal(amount)
}

impl TransactionForm {
    /// Validate every field, collecting all problems. Type defaults to Debit
    /// and status to Posted.
    pub fn validate(&self) -> Result<TransactionInput, Vec<String>> {
        let mut errors = Vec::new();
        let date = self.date.clone().unwrap_or_default();
        let account = self.account.clone().unwrap_or_default();
        let description = self.description.clone().unwrap_or_default();

        errors.extend(validate::validate_date(&date, "Date"));
        errors.extend(validate::validate_required(&account, "Account", 100));
        errors.extend(validate::validate_required(&description, "Description", 255));

        let amount = parse_amount(self.amount.as_ref()).filter(|m| m.is_positive());
        match amount {
            None => errors.push("Amount must be greater than 0".to_string()),
            Some(m) if m.exceeds_max() => errors.push("Amount is too large".to_string()),
            Some(_) => {}
        }

        let txn_type = match self.txn_type.as_deref().filter(|t| !t.trim().is_empty()) {
            None => Some(TxnType::Debit),
            Some(t) => t.parse::<TxnType>().map_err(|e| errors.push(e)).ok(),
        };
        let status = match self.status.as_deref().filter(|s| !s.trim().is_empty()) {
            None => Some(TxnStatus::Posted),
            Some(s) => s.parse::<TxnStatus>().map_err(|e| errors.push(e)).ok(),
        };

        match (amount, txn_type, status) {
            (Some(amount), Some(txn_type), Some(status)) if errors.is_empty() => Ok(TransactionInput {
                date: date.trim().to_string(),
                account: account.trim().to_string(),
                description: description.trim().to_string(),
                txn_type,
                amount,
                status,
            }),
            _ => Err(errors),
        }
    }
}

const SELECT_TRANSACTION: &str = "SELECT id, txn_date, account, description, txn_type, amount_cents, \
     status, created_by, created_at, updated_at FROM transactions";

pub async fn find_all(pool: &DbPool, filter: &ListFilter) -> Result<Vec<Transaction>, AppError> {
    let rows = sqlx::query_as::<_, Transaction>(&format!(
        "{SELECT_TRANSACTION} \
         WHERE (?1 IS NULL OR LOWER(account) LIKE ?1 ESCAPE '\\' OR LOWER(description) LIKE ?1 ESCAPE '\\') \
           AND (?2 IS NULL OR LOWER(txn_type) = LOWER(?2)) \
           AND (?3 IS NULL OR LOWER(status) = LOWER(?3)) \
         ORDER BY txn_date DESC, id DESC"
    ))
    .bind(filter.pattern())
    .bind(filter.kind())
    .bind(filter.status())
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn find_by_id(pool: &DbPool, id: i64) -> Result<Option<Transaction>, AppError> {
    let row = sqlx::query_as::<_, Transaction>(&format!("{SELECT_TRANSACTION} WHERE id = ?1"))
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

/// Posted transactions dated within `[start, end]`, oldest first.
pub async fn find_posted_between(
    pool: &DbPool,
    start: Option<&str>,
    end: Option<&str>,
) -> Result<Vec<Transaction>, AppError> {
    let rows = sqlx::query_as::<_, Transaction>(&format!(
        "{SELECT_TRANSACTION} \
         WHERE status = 'Posted' \
           AND (?1 IS NULL OR txn_date >= ?1) \
           AND (?2 IS NULL OR txn_date <= ?2) \
         ORDER BY txn_date, id"
    ))
    .bind(start)
    .bind(end)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn create(pool: &DbPool, input: &TransactionInput, created_by: i64) -> Result<i64, AppError> {
    let id = sqlx::query_scalar(
        "INSERT INTO transactions (txn_date, account, description, txn_type, amount_cents, status, created_by, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8) RETURNING id",
    )
    .bind(&input.date)
    .bind(&input.account)
    .bind(&input.description)
    .bind(input.txn_type.as_str())
    .bind(input.amount.cents())
    .bind(input.status.as_str())
    .bind(created_by)
    .bind(time::now())
    .fetch_one(pool)
    .await?;
    Ok(id)
}

pub async fn update(pool: &DbPool, id: i64, input: &TransactionInput) -> Result<bool, AppError> {
    let result = sqlx::query(
        "UPDATE transactions SET txn_date = ?1, account = ?2, description = ?3, txn_type = ?4, \
         amount_cents = ?5, status = ?6, updated_at = ?7 WHERE id = ?8",
    )
    .bind(&input.date)
    .bind(&input.account)
    .bind(&input.description)
    .bind(input.txn_type.as_str())
    .bind(input.amount.cents())
    .bind(input.status.as_str())
    .bind(time::now())
    .bind(id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn delete(pool: &DbPool, id: i64) -> Result<bool, AppError> {
    let result = sqlx::query("DELETE FROM transactions WHERE id = ?1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
