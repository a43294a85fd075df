//! Shared test infrastructure.
//!
//! - `setup_test_db()` - fresh SQLite file in a temp dir, migrated and seeded
//!   with the admin user and the feedback statistics row.
//! - insert helpers for users, clients and transactions.

#![allow(dead_code, unused_macros)]

use tempfile::TempDir;

use ledgerdesk::auth::password;
use ledgerdesk::db::{self, DbPool};
use ledgerdesk::models::money::Money;
use ledgerdesk::models::transaction::{self, TransactionInput, TxnStatus, TxnType};
use ledgerdesk::models::user::{self, NewUser, Role, UserStatus};

// ============================================================================
// TEST CONSTANTS
// ============================================================================

pub const ADMIN_USER: &str = "admin";
pub const ADMIN_PASS: &str = "admin123";
pub const CLIENT_PASS: &str = "client123";

// ============================================================================
// DATABASE SETUP
// ============================================================================

/// Temp database. Keep it alive for as long as the pool is used.
pub struct TestDb {
    pool: DbPool,
    dir: TempDir,
}

impl TestDb {
    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    pub fn dir(&self) -> &std::path::Path {
        self.dir.path()
    }
}

pub async fn setup_test_db() -> TestDb {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let url = format!("sqlite://{}", dir.path().join("test.db").display());
    let pool = db::init_pool(&url).await.expect("Failed to open test DB");
    db::run_migrations(&pool).await.expect("Failed to run migrations");

    let hash = password::hash_password(ADMIN_PASS).expect("hash admin password");
    db::seed_admin(&pool, &hash).await.expect("seed admin");
    db::seed_feedback_stats(&pool).await.expect("seed feedback stats");

    TestDb { pool, dir }
}

// ============================================================================
// INSERT HELPERS
// ============================================================================

pub async fn insert_user(pool: &DbPool, username: &str, role: Role, plain: &str) -> i64 {
    let new_user = NewUser {
        username: username.to_string(),
        email: format!("{username}@example.com"),
        password: password::hash_password(plain).expect("hash"),
        full_name: format!("{username} Tester"),
        role,
        status: UserStatus::Active,
    };
    user::create(pool, &new_user).await.expect("create user")
}

pub async fn admin_id(pool: &DbPool) -> i64 {
    user::find_by_login(pool, ADMIN_USER)
        .await
        .expect("query")
        .expect("admin exists")
        .id
}

pub async fn insert_client(pool: &DbPool, user_id: i64, company: &str) -> i64 {
    sqlx::query_scalar(
        "INSERT INTO clients (user_id, company_name, contact_person, email, created_at) \
         VALUES (?1, ?2, 'Contact', 'contact@example.com', datetime('now', 'localtime')) RETURNING id",
    )
    .bind(user_id)
    .bind(company)
    .fetch_one(pool)
    .await
    .expect("insert client")
}

pub async fn insert_txn(
    pool: &DbPool,
    date: &str,
    account: &str,
    txn_type: TxnType,
    cents: i64,
    status: TxnStatus,
) -> i64 {
    let input = TransactionInput {
        date: date.to_string(),
        account: account.to_string(),
        description: format!("{account} entry"),
        txn_type,
        amount: Money(cents),
        status,
    };
    transaction::create(pool, &input, 1).await.expect("insert transaction")
}

// ============================================================================
// HTTP HELPERS
// ============================================================================

/// Initialise the full route table against a `TestDb`, the way `main` does.
/// The login limiter allows three failures.
macro_rules! test_app {
    ($db:expr) => {
        test_app!($db, ledgerdesk::config::AppConfig::default())
    };
    ($db:expr, $config:expr) => {
        actix_web::test::init_service(
            actix_web::App::new()
                .wrap(
                    actix_session::SessionMiddleware::builder(
                        actix_session::storage::CookieSessionStore::default(),
                        actix_web::cookie::Key::generate(),
                    )
                    .cookie_secure(false)
                    .build(),
                )
                .app_data(actix_web::web::Data::new($db.pool().clone()))
                .app_data(actix_web::web::Data::new($config))
                .app_data(actix_web::web::Data::new(
                    ledgerdesk::auth::rate_limit::RateLimiter::new(3, 900),
                ))
                .configure(ledgerdesk::handlers::configure)
                .default_service(actix_web::web::to(ledgerdesk::handlers::not_found)),
        )
        .await
    };
}

/// Log in and return the session cookie.
macro_rules! login {
    ($app:expr, $user:expr, $pass:expr) => {{
        let req = actix_web::test::TestRequest::post()
            .uri("/api/auth/login")
            .set_json(serde_json::json!({ "username": $user, "password": $pass }))
            .to_request();
        let resp = actix_web::test::call_service(&$app, req).await;
        assert_eq!(resp.status(), actix_web::http::StatusCode::OK, "login as {}", $user);
        resp.response()
            .cookies()
            .find(|c| c.name() == "id")
            .expect("session cookie")
            .into_owned()
    }};
}
