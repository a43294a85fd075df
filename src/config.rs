use std::path::PathBuf;
use std::str::FromStr;

/// Runtime settings, read once at startup and shared as `web::Data<AppConfig>`.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub bind_addr: String,
    pub session_key: Option<String>,
    pub session_timeout_secs: i64,
    pub max_login_attempts: usize,
    pub login_window_secs: u64,
    pub upload_dir: PathBuf,
    pub max_upload_bytes: u64,
    pub static_dir: PathBuf,
    pub cookie_secure: bool,
    pub cors_allowed_origin: Option<String>,
    pub admin_password: String,
    pub seed_demo: bool,
    pub audit_retention_days: i64,
    pub app_name: String,
    pub app_version: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite://data/ledgerdesk.db".to_string(),
            bind_addr: "127.0.0.1:8080".to_string(),
            session_key: None,
            session_timeout_secs: 3600,
            max_login_attempts: 5,
            login_window_secs: 900,
            upload_dir: PathBuf::from("uploads/documents"),
            max_upload_bytes: 5 * 1024 * 1024 * 1024,
            static_dir: PathBuf::from("static"),
            cookie_secure: false,
            cors_allowed_origin: None,
            admin_password: "admin123".to_string(),
            seed_demo: false,
            audit_retention_days: 90,
            app_name: "Accounting System".to_string(),
            app_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

impl AppConfig {
    /// Load from the process environment, after reading `.env` if present.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        let defaults = Self::default();
        let var = |key: &str| std::env::var(key).ok().filter(|v| !v.trim().is_empty());

        Self {
            database_url: var("DATABASE_URL").unwrap_or(defaults.database_url),
            bind_addr: var("BIND_ADDR").unwrap_or(defaults.bind_addr),
            session_key: var("SESSION_KEY"),
            session_timeout_secs: parse_or(
                "SESSION_TIMEOUT_SECS",
                var("SESSION_TIMEOUT_SECS"),
                defaults.session_timeout_secs,
            ),
            max_login_attempts: parse_or(
                "MAX_LOGIN_ATTEMPTS",
                var("MAX_LOGIN_ATTEMPTS"),
                defaults.max_login_attempts,
            ),
            login_window_secs: parse_or(
                "LOGIN_WINDOW_SECS",
                var("LOGIN_WINDOW_SECS"),
                defaults.login_window_secs,
            ),
            upload_dir: var("UPLOAD_DIR").map(PathBuf::from).unwrap_or(defaults.upload_dir),
            max_upload_bytes: parse_or(
                "MAX_UPLOAD_BYTES",
                var("MAX_UPLOAD_BYTES"),
                defaults.max_upload_bytes,
            ),
            static_dir: var("STATIC_DIR").map(PathBuf::from).unwrap_or(defaults.static_dir),
            cookie_secure: flag_value(var("COOKIE_SECURE"), defaults.cookie_secure),
            cors_allowed_origin: var("CORS_ALLOWED_ORIGIN"),
            admin_password: var("ADMIN_PASSWORD").unwrap_or(defaults.admin_password),
            seed_demo: flag_value(var("SEED_DEMO"), defaults.seed_demo),
            audit_retention_days: parse_or(
                "AUDIT_RETENTION_DAYS",
                var("AUDIT_RETENTION_DAYS"),
                defaults.audit_retention_days,
            ),
            app_name: var("APP_NAME").unwrap_or(defaults.app_name),
            app_version: var("APP_VERSION").unwrap_or(defaults.app_version),
        }
    }

    /// Path of the SQLite file behind `database_url`, if it names one.
    pub fn sqlite_file(&self) -> Option<PathBuf> {
        let rest = self
            .database_url
            .strip_prefix("sqlite://")
            .or_else(|| self.database_url.strip_prefix("sqlite:"))?;
        let path = rest.split('?').next().unwrap_or(rest);
        if path.is_empty() || path.starts_with(":memory:") {
            return None;
        }
        Some(PathBuf::from(path))
    }
}

/// Parse `raw`, falling back to `default` (with a warning) when it is malformed.
pub fn parse_or<T: FromStr + Copy + std::fmt::Display>(key: &str, raw: Option<String>, default: T) -> T {
    match raw {
        None => default,
        Some(value) => match value.trim().parse::<T>() {
            Ok(parsed) => parsed,
            Err(_) => {
                log::warn!("Invalid value '{value}' for {key}, using default {default}");
                default
            }
        },
    }
}

pub fn flag_value(raw: Option<String>, default: bool) -> bool {
    match raw.as_deref().map(|v| v.trim().to_ascii_lowercase()) {
        Some(v) if matches!(v.as_str(), "1" | "true" | "yes" | "on") => true,
        Some(v) if matches!(v.as_str(), "0" | "false" | "no" | "off") => false,
        _ => default,
    }
}
