use std::str::FromStr;

use sqlx::migrate::Migrator;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};

use crate::time;

pub type DbPool = SqlitePool;

pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

pub async fn init_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal);
    SqlitePoolOptions::new()
        .max_connections(8)
        .connect_with(options)
        .await
}

pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    MIGRATOR.run(pool).await?;
    log::info!("Database migrations complete");
    Ok(())
}

/// Create the default `admin` account when no users exist yet.
pub async fn seed_admin(pool: &DbPool, admin_password_hash: &str) -> Result<bool, sqlx::Error> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(pool)
        .await?;
    if count > 0 {
        log::info!("Database already has {count} users, skipping admin seed");
        return Ok(false);
    }

    sqlx::query(
        "INSERT INTO users (username, email, password, full_name, role, status, created_at) \
         VALUES ('admin', 'admin@accounting.local', ?1, 'System Administrator', 'Admin', 'active', ?2)",
    )
    .bind(admin_password_hash)
    .bind(time::now())
    .execute(pool)
    .await?;
    log::info!("Seeded default admin user");
    Ok(true)
}

/// The single statistics row that feedback submissions update.
pub async fn seed_feedback_stats(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT OR IGNORE INTO feedback_stats \
         (id, total_feedback, satisfied_clients, average_rating, compliance_rate) \
         VALUES (1, 0, 0, 0.0, 0)",
    )
    .execute(pool)
    .await?;
    Ok(())
}

const DEMO_DEPARTMENTS: &[(&str, &str)] = &[
    ("Accounting", "General ledger and bookkeeping"),
    ("Tax Services", "Tax preparation and filings"),
    ("Payroll", "Payroll processing"),
    ("Advisory", "Financial consulting"),
];

const DEMO_ACCOUNTS: &[(&str, &str, &str)] = &[
    ("1000", "Cash", "Asset"),
    ("1100", "Accounts Receivable", "Asset"),
    ("2000", "Accounts Payable", "Liability"),
    ("3000", "Owner's Equity", "Equity"),
    ("4000", "Service Revenue", "Revenue"),
    ("5000", "Office Expense", "Expense"),
    ("5100", "Rent Expense", "Expense"),
];

// (date offset in days, account, description, type, cents)
const DEMO_TRANSACTIONS: &[(i64, &str, &str, &str, i64)] = &[
    (30, "Cash", "Initial capital", "Debit", 5_000_000),
    (30, "Owner's Equity", "Initial capital", "Credit", 5_000_000),
    (20, "Accounts Receivable", "Consulting engagement", "Debit", 1_250_000),
    (20, "Service Revenue", "Consulting engagement", "Credit", 1_250_000),
    (10, "Rent Expense", "Office rent", "Debit", 300_000),
    (10, "Cash", "Office rent", "Credit", 300_000),
    (5, "Office Expense", "Supplies", "Debit", 45_000),
    (5, "Accounts Payable", "Supplies on credit", "Credit", 45_000),
];

async fn table_is_empty(pool: &DbPool, table: &str) -> Result<bool, sqlx::Error> {
    let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
        .fetch_one(pool)
        .await?;
    Ok(count == 0)
}

/// Demo data for a fresh install: departments, chart of accounts, ledger
/// entries, and a client with two invoices. Each group is skipped when its
/// table already has rows.
pub async fn seed_demo(pool: &DbPool, client_password_hash: &str) -> Result<(), sqlx::Error> {
    let now = time::now();

    if table_is_empty(pool, "departments").await? {
        for (name, description) in DEMO_DEPARTMENTS {
            sqlx::query(
                "INSERT INTO departments (name, description, status, created_at) VALUES (?1, ?2, 'Active', ?3)",
            )
            .bind(name)
            .bind(description)
            .bind(&now)
            .execute(pool)
            .await?;
        }
        log::info!("Seeded {} demo departments", DEMO_DEPARTMENTS.len());
    }

    if table_is_empty(pool, "accounts").await? {
        for (code, name, kind) in DEMO_ACCOUNTS {
            sqlx::query(
                "INSERT INTO accounts (code, name, account_type, status, created_at) VALUES (?1, ?2, ?3, 'Active', ?4)",
            )
            .bind(code)
            .bind(name)
            .bind(kind)
            .bind(&now)
            .execute(pool)
            .await?;
        }
        log::info!("Seeded {} demo accounts", DEMO_ACCOUNTS.len());
    }

    if table_is_empty(pool, "transactions").await? {
        for (offset, account, description, kind, cents) in DEMO_TRANSACTIONS {
            let date = (chrono::Local::now() - chrono::Duration::days(*offset))
                .format(time::DATE_FORMAT)
                .to_string();
            sqlx::query(
                "INSERT INTO transactions (txn_date, account, description, txn_type, amount_cents, status, created_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, 'Posted', ?6)",
            )
            .bind(date)
            .bind(account)
            .bind(description)
            .bind(kind)
            .bind(cents)
            .bind(&now)
            .execute(pool)
            .await?;
        }
        log::info!("Seeded {} demo transactions", DEMO_TRANSACTIONS.len());
    }

    if table_is_empty(pool, "clients").await? {
        let mut tx = pool.begin().await?;
        let user_id: i64 = sqlx::query_scalar(
            "INSERT INTO users (username, email, password, full_name, role, status, created_at) \
             VALUES ('democlient', 'client@example.com', ?1, 'Demo Client', 'Client', 'active', ?2) \
             RETURNING id",
        )
        .bind(client_password_hash)
        .bind(&now)
        .fetch_one(&mut *tx)
        .await?;

        let client_id: i64 = sqlx::query_scalar(
            "INSERT INTO clients (user_id, company_name, contact_person, email, created_at) \
             VALUES (?1, 'Demo Trading Ltd', 'Demo Client', 'client@example.com', ?2) RETURNING id",
        )
        .bind(user_id)
        .bind(&now)
        .fetch_one(&mut *tx)
        .await?;

        let year = chrono::Local::now().format("%Y").to_string();
        let invoices = [
            (format!("INV-{year}-001"), "Monthly bookkeeping", 150_000i64, 15_000i64, "Paid", 15i64),
            (format!("INV-{year}-002"), "Quarterly tax filing", 250_000, 25_000, "Pending", -15),
        ];
        for (number, description, amount, tax, status, due_offset) in invoices {
            let due = (chrono::Local::now() - chrono::Duration::days(due_offset))
                .format(time::DATE_FORMAT)
                .to_string();
            let paid_date = (status == "Paid").then(|| now.clone());
            let invoice_id: i64 = sqlx::query_scalar(
                "INSERT INTO invoices (invoice_number, client_id, client_user_id, description, amount_cents, \
                 tax_cents, total_cents, status, due_date, created_date, paid_date) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11) RETURNING id",
            )
            .bind(&number)
            .bind(client_id)
            .bind(user_id)
            .bind(description)
            .bind(amount)
            .bind(tax)
            .bind(amount + tax)
            .bind(status)
            .bind(due)
            .bind(&now)
            .bind(paid_date)
            .fetch_one(&mut *tx)
            .await?;

            sqlx::query(
                "INSERT INTO invoice_items (invoice_id, description, quantity, unit_price_cents, total_cents) \
                 VALUES (?1, ?2, 1, ?3, ?3)",
            )
            .bind(invoice_id)
            .bind(description)
            .bind(amount)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        log::info!("Seeded demo client with invoices");
    }

    Ok(())
}
