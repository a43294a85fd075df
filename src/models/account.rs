use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;

use crate::db::DbPool;
use crate::errors::{AppError, conflict_on_unique};
use crate::time;
use super::common::{ActiveStatus, ListFilter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccountType {
    Asset,
    Liability,
    Equity,
    Revenue,
    Expense,
}

impl AccountType {
    pub fn as_str(self) -> &'static str {
        match self {
            AccountType::Asset => "Asset",
            AccountType::Liability => "Liability",
            AccountType::Equity => "Equity",
            AccountType::Revenue => "Revenue",
            AccountType::Expense => "Expense",
        }
    }

    /// Best guess from an account name when it is not in the chart of accounts.
    pub fn guess_from_name(name: &str) -> Option<AccountType> {
        let lower = name.to_lowercase();
        if lower.contains("revenue") {
            Some(AccountType::Revenue)
        } else if lower.contains("expense") {
            Some(AccountType::Expense)
        } else if lower.contains("cash") || lower.contains("accounts receivable") {
            Some(AccountType::Asset)
        } else if lower.contains("accounts payable") {
            Some(AccountType::Liability)
        } else {
            None
        }
    }
}

impl FromStr for AccountType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asset" => Ok(AccountType::Asset),
            "liability" => Ok(AccountType::Liability),
            "equity" => Ok(AccountType::Equity),
            "revenue" => Ok(AccountType::Revenue),
            "expense" => Ok(AccountType::Expense),
            _ => Err("Type must be one of Asset, Liability, Equity, Revenue, Expense".to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Account {
    pub id: i64,
    pub code: String,
    pub name: String,
    #[serde(rename = "type")]
    pub account_type: String,
    pub status: String,
    pub created_at: String,
    pub updated_at: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AccountForm {
    pub code: Option<String>,
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub account_type: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug)]
pub struct AccountChanges {
    pub code: Option<String>,
    pub name: Option<String>,
    pub account_type: Option<AccountType>,
    pub status: Option<ActiveStatus>,
}

const DUPLICATE_CODE: &str = "Account code already exists";
const SELECT_ACCOUNT: &str =
    "SELECT id, code, name, account_type, status, created_at, updated_at FROM accounts";

pub async fn find_all(pool: &DbPool, filter: &ListFilter) -> Result<Vec<Account>, AppError> {
    let rows = sqlx::query_as::<_, Account>(&format!(
        "{SELECT_ACCOUNT} \
         WHERE (?1 IS NULL OR LOWER(code) LIKE ?1 ESCAPE '\\' OR LOWER(name) LIKE ?1 ESCAPE '\\') \
           AND (?2 IS NULL OR LOWER(account_type) = LOWER(?2)) \
           AND (?3 IS NULL OR LOWER(status) = LOWER(?3)) \
         ORDER BY code"
    ))
    .bind(filter.pattern())
    .bind(filter.kind())
    .bind(filter.status())
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn find_by_id(pool: &DbPool, id: i64) -> Result<Option<Account>, AppError> {
    let row = sqlx::query_as::<_, Account>(&format!("{SELECT_ACCOUNT} WHERE id = ?1"))
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

pub async fn create(
    pool: &DbPool,
    code: &str,
    name: &str,
    account_type: AccountType,
    status: ActiveStatus,
) -> Result<i64, AppError> {
    let id = sqlx::query_scalar(
        "INSERT INTO accounts (code, name, account_type, status, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5) RETURNING id",
    )
    .bind(code.trim())
    .bind(name.trim())
    .bind(account_type.as_str())
    .bind(status.as_str())
    .bind(time::now())
    .fetch_one(pool)
    .await
    .map_err(|e| conflict_on_unique(e, DUPLICATE_CODE))?;
    Ok(id)
}

pub async fn update(pool: &DbPool, id: i64, changes: &AccountChanges) -> Result<bool, AppError> {
    let result = sqlx::query(
        "UPDATE accounts SET \
            code = COALESCE(?1, code), \
            name = COALESCE(?2, name), \
            account_type = COALESCE(?3, account_type), \
            status = COALESCE(?4, status), \
            updated_at = ?5 \
         WHERE id = ?6",
    )
    .bind(changes.code.as_deref().map(str::trim))
    .bind(changes.name.as_deref().map(str::trim))
    .bind(changes.account_type.map(AccountType::as_str))
    .bind(changes.status.map(ActiveStatus::as_str))
    .bind(time::now())
    .bind(id)
    .execute(pool)
    .await
    .map_err(|e| conflict_on_unique(e, DUPLICATE_CODE))?;
    Ok(result.rows_affected() > 0)
}

pub async fn delete(pool: &DbPool, id: i64) -> Result<bool, AppError> {
    let result = sqlx::query("DELETE FROM accounts WHERE id = ?1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Account name to type, for every account in the chart.
pub async fn type_map(pool: &DbPool) -> Result<HashMap<String, AccountType>, AppError> {
    let rows: Vec<(String, String)> = sqlx::query_as("SELECT name, account_type FROM accounts")
        .fetch_all(pool)
        .await?;
    Ok(rows
        .into_iter()
        .filter_map(|(name, kind)| kind.parse().ok().map(|t| (name, t)))
        .collect())
}
