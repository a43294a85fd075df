//! Financial reports computed from posted ledger transactions.

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;

use crate::db::DbPool;
use crate::errors::AppError;
use crate::response::escape_csv;
use crate::time;
use super::account::AccountType;
use super::money::Money;
use super::transaction::Transaction;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportKind {
    Income,
    Balance,
    Trial,
}

impl ReportKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ReportKind::Income => "income",
            ReportKind::Balance => "balance",
            ReportKind::Trial => "trial",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            ReportKind::Income => "Income Statement",
            ReportKind::Balance => "Balance Sheet",
            ReportKind::Trial => "Trial Balance",
        }
    }
}

impl FromStr for ReportKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "income" => Ok(ReportKind::Income),
            "balance" => Ok(ReportKind::Balance),
            "trial" => Ok(ReportKind::Trial),
            other => Err(format!("Unknown report type '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ReportRow {
    Line { label: String, value: Money },
    Account { account: String, debit: Money, credit: Money },
}

#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub report_type: ReportKind,
    pub title: String,
    pub start: Option<String>,
    pub end: Option<String>,
    pub rows: Vec<ReportRow>,
    pub totals: BTreeMap<String, Money>,
}

impl Report {
    /// `Income Statement` becomes `income_statement.csv`.
    pub fn file_name(&self) -> String {
        let stem: Vec<String> = self
            .title
            .split_whitespace()
            .map(str::to_lowercase)
            .collect();
        format!("{}.csv", stem.join("_"))
    }

    pub fn to_csv(&self) -> String {
        let mut csv = format!("{}\n", escape_csv(&self.title));
        match self.report_type {
            ReportKind::Trial => {
                csv.push_str("Account,Debit,Credit\n");
                for row in &self.rows {
                    if let ReportRow::Account { account, debit, credit } = row {
                        csv.push_str(&format!("{},{debit},{credit}\n", escape_csv(account)));
                    }
                }
                let total = |key: &str| self.totals.get(key).copied().unwrap_or_default();
                csv.push_str(&format!("Totals,{},{}\n", total("debit"), total("credit")));
            }
            _ => {
                csv.push_str("Item,Value\n");
                for row in &self.rows {
                    if let ReportRow::Line { label, value } = row {
                        csv.push_str(&format!("{},{value}\n", escape_csv(label)));
                    }
                }
            }
        }
        csv
    }
}

/// Chart-of-accounts type when the account is known, else a guess from its name.
pub fn classify(account: &str, types: &HashMap<String, AccountType>) -> Option<AccountType> {
    types
        .get(account)
        .copied()
        .or_else(|| AccountType::guess_from_name(account))
}

fn signed(txn: &Transaction, positive: &str) -> Money {
    if txn.txn_type == positive {
        txn.amount
    } else {
        Money(-txn.amount.cents())
    }
}

fn line(label: &str, value: Money) -> ReportRow {
    ReportRow::Line {
        label: label.to_string(),
        value,
    }
}

/// Build a report from already-filtered posted transactions.
pub fn generate(
    kind: ReportKind,
    txns: &[Transaction],
    types: &HashMap<String, AccountType>,
    start: Option<&str>,
    end: Option<&str>,
) -> Report {
    let of_type = |wanted: AccountType| {
        txns.iter()
            .filter(move |t| classify(&t.account, types) == Some(wanted))
    };
    let mut totals = BTreeMap::new();

    let rows = match kind {
        ReportKind::Income => {
            let revenue: Money = of_type(AccountType::Revenue)
                .filter(|t| t.txn_type == "Credit")
                .map(|t| t.amount)
                .sum();
            let expenses: Money = of_type(AccountType::Expense)
                .filter(|t| t.txn_type == "Debit")
                .map(|t| t.amount)
                .sum();
            let net = revenue - expenses;
            totals.insert("revenue".to_string(), revenue);
            totals.insert("expenses".to_string(), expenses);
            totals.insert("net".to_string(), net);
            vec![
                line("Revenue", revenue),
                line("Expenses", expenses),
                line("Net Income", net),
            ]
        }
        ReportKind::Balance => {
            let assets: Money = of_type(AccountType::Asset).map(|t| signed(t, "Debit")).sum();
            let liabilities: Money = of_type(AccountType::Liability)
                .map(|t| signed(t, "Credit"))
                .sum();
            let equity = assets - liabilities;
            totals.insert("assets".to_string(), assets);
            totals.insert("liabilities".to_string(), liabilities);
            totals.insert("equity".to_string(), equity);
            vec![
                line("Assets", assets),
                line("Liabilities", liabilities),
                line("Equity", equity),
            ]
        }
        ReportKind::Trial => {
            let mut by_account: BTreeMap<&str, (Money, Money)> = BTreeMap::new();
            for t in txns {
                let entry = by_account.entry(t.account.as_str()).or_default();
                if t.txn_type == "Credit" {
                    entry.1 += t.amount;
                } else {
                    entry.0 += t.amount;
                }
            }
            let debit: Money = by_account.values().map(|(d, _)| *d).sum();
            let credit: Money = by_account.values().map(|(_, c)| *c).sum();
            totals.insert("debit".to_string(), debit);
            totals.insert("credit".to_string(), credit);
            by_account
                .into_iter()
                .map(|(account, (debit, credit))| ReportRow::Account {
                    account: account.to_string(),
                    debit,
                    credit,
                })
                .collect()
        }
    };

    Report {
        report_type: kind,
        title: kind.title().to_string(),
        start: start.map(String::from),
        end: end.map(String::from),
        rows,
        totals,
    }
}

/// Log that a report was produced.
pub async fn record(pool: &DbPool, kind: ReportKind, generated_by: i64) -> Result<i64, AppError> {
    let id = sqlx::query_scalar(
        "INSERT INTO reports (report_type, generated_by, created_at) VALUES (?1, ?2, ?3) RETURNING id",
    )
    .bind(kind.as_str())
    .bind(generated_by)
    .bind(time::now())
    .fetch_one(pool)
    .await?;
    Ok(id)
}

pub async fn count_since(pool: &DbPool, since: &str) -> Result<i64, AppError> {
    let count = sqlx::query_scalar("SELECT COUNT(*) FROM reports WHERE created_at >= ?1")
        .bind(since)
        .fetch_one(pool)
        .await?;
    Ok(count)
}

pub async fn last_generated_at(pool: &DbPool) -> Result<Option<String>, AppError> {
    let latest = sqlx::query_scalar("SELECT MAX(created_at) FROM reports")
        .fetch_one(pool)
        .await?;
    Ok(latest)
}
