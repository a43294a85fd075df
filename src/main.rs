use actix_session::{SessionMiddleware, storage::CookieSessionStore};
use actix_web::{App, HttpServer, cookie::Key, middleware, web};

use ledgerdesk::auth::{password, rate_limit::RateLimiter};
use ledgerdesk::config::AppConfig;
use ledgerdesk::{audit, db, handlers};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let _ = dotenvy::dotenv();
    env_logger::init();
    let config = AppConfig::from_env();

    // Ensure the database directory exists
    if let Some(parent) = config.sqlite_file().as_deref().and_then(|f| f.parent()) {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let pool = db::init_pool(&config.database_url)
        .await
        .expect("Failed to open database");
    db::run_migrations(&pool).await.expect("Failed to run migrations");

    let admin_hash = password::hash_password(&config.admin_password)
        .expect("Failed to hash default admin password");
    db::seed_admin(&pool, &admin_hash).await.expect("Failed to seed admin user");
    db::seed_feedback_stats(&pool).await.expect("Failed to seed feedback statistics");
    if config.seed_demo {
        let demo_hash = password::hash_password("client123").expect("Failed to hash demo password");
        db::seed_demo(&pool, &demo_hash).await.expect("Failed to seed demo data");
    }

    // Clean up old audit entries based on retention policy
    if let Err(e) = audit::cleanup_old_entries(&pool, config.audit_retention_days).await {
        log::warn!("Audit cleanup failed: {e}");
    }

    // Session encryption key: SESSION_KEY keeps sessions valid across restarts
    let secret_key = match config.session_key.as_deref() {
        Some(val) if val.len() >= 64 => {
            log::info!("Using SESSION_KEY from environment");
            Key::from(val.as_bytes())
        }
        Some(val) => {
            log::warn!("SESSION_KEY too short ({} bytes, need 64+), generating random key", val.len());
            Key::generate()
        }
        None => {
            log::warn!("No SESSION_KEY set, generating random key (sessions lost on restart)");
            Key::generate()
        }
    };

    let limiter = web::Data::new(RateLimiter::new(
        config.max_login_attempts,
        config.login_window_secs,
    ));
    let bind_addr = config.bind_addr.clone();
    let config = web::Data::new(config);

    log::info!("Starting {} at http://{bind_addr}", config.app_name);

    HttpServer::new(move || {
        let session_mw = SessionMiddleware::builder(CookieSessionStore::default(), secret_key.clone())
            .cookie_secure(config.cookie_secure)
            .cookie_http_only(true)
            .build();

        let mut app = App::new()
            .wrap(session_mw)
            .wrap(handlers::cors(config.cors_allowed_origin.as_deref()))
            .wrap(middleware::Logger::default())
            .app_data(web::Data::new(pool.clone()))
            .app_data(config.clone())
            .app_data(limiter.clone())
            .configure(handlers::configure);

        if config.static_dir.is_dir() {
            app = app.service(
                actix_files::Files::new("/", &config.static_dir).index_file("index.html"),
            );
        }

        // Default 404 handler (must be registered last)
        app.default_service(web::to(handlers::not_found))
    })
    .bind(bind_addr)?
    .run()
    .await
}
