use std::net::{IpAddr, Ipv4Addr};

use actix_session::Session;
use actix_web::{HttpRequest, HttpResponse, web};
use serde::Deserialize;
use serde_json::json;

use crate::auth::rate_limit::RateLimiter;
use crate::auth::session::{self, SessionUser};
use crate::auth::{password, validate};
use crate::config::AppConfig;
use crate::db::DbPool;
use crate::errors::AppError;
use crate::models::user::{self, NewUser, Role, UserStatus, UserSummary};
use crate::response;
use crate::time;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct RegisterRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub full_name: Option<String>,
}

pub fn client_ip(req: &HttpRequest) -> IpAddr {
    req.peer_addr()
        .map(|addr| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
}

pub async fn login(
    req: HttpRequest,
    pool: web::Data<DbPool>,
    session: Session,
    limiter: web::Data<RateLimiter>,
    body: web::Json<LoginRequest>,
) -> Result<HttpResponse, AppError> {
    // Rate-limit check BEFORE any database access
    let ip = client_ip(&req);
    if limiter.is_blocked(ip) {
        log::warn!("Login blocked for {ip}: too many failed attempts");
        return Err(AppError::TooManyRequests(
            "Too many failed login attempts. Please try again later.".to_string(),
        ));
    }

    let login = body.username.trim();
    if login.is_empty() || body.password.is_empty() {
        return Err(AppError::BadRequest("Username and password are required".to_string()));
    }

    let found = user::find_by_login(&pool, login)
        .await?
        .filter(|u| u.is_active())
        .filter(|u| password::verify_password(&body.password, &u.password));

    let Some(u) = found else {
        limiter.record_failure(ip);
        log::warn!("Failed login for '{login}' from {ip}");
        return Err(AppError::Unauthorized("Invalid credentials".to_string()));
    };

    limiter.clear(ip);
    user::touch_last_login(&pool, u.id).await?;

    let role = u.role();
    session::start(
        &session,
        &SessionUser {
            id: u.id,
            username: u.username.clone(),
            role,
            login_time: time::unix_now(),
        },
    )?;
    log::info!("User '{}' logged in", u.username);

    let details = json!({ "summary": format!("User '{}' logged in", u.username) });
    let _ = crate::audit::log(&pool, u.id, "user.login", "user", u.id, details).await;

    Ok(response::success(
        json!({
            "user": UserSummary::from(&u),
            "redirect": role.landing_page(),
        }),
        "Login successful",
    ))
}

pub async fn logout(session: Session) -> HttpResponse {
    if let Ok(Some(username)) = session.get::<String>(session::USERNAME) {
        log::info!("User '{username}' logged out");
    }
    session.purge();
    response::success(json!({}), "Logged out successfully")
}

/// Self-service sign-up. Always creates an active Client.
pub async fn register(
    pool: web::Data<DbPool>,
    body: web::Json<RegisterRequest>,
) -> Result<HttpResponse, AppError> {
    let fields = [
        ("username", &body.username),
        ("email", &body.email),
        ("password", &body.password),
        ("full_name", &body.full_name),
    ];
    for (name, value) in fields {
        if value.as_deref().is_none_or(|v| v.trim().is_empty()) {
            return Err(AppError::BadRequest(format!("Field {name} is required")));
        }
    }

    let username = body.username.clone().unwrap_or_default();
    let email = body.email.clone().unwrap_or_default();
    let plain = body.password.clone().unwrap_or_default();
    let full_name = body.full_name.clone().unwrap_or_default();

    let mut errors = Vec::new();
    errors.extend(validate::validate_username(&username));
    errors.extend(validate::validate_email(&email));
    errors.extend(validate::validate_password(&plain));
    errors.extend(validate::validate_required(&full_name, "Full name", 100));
    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }

    if user::username_or_email_taken(&pool, &username, &email, None).await? {
        return Err(AppError::Conflict("Username or email already exists".to_string()));
    }

    let new_user = NewUser {
        username,
        email,
        password: password::hash_password(&plain)?,
        full_name,
        role: Role::Client,
        status: UserStatus::Active,
    };
    let user_id = user::create(&pool, &new_user).await?;
    log::info!("Registered client '{}'", new_user.username);

    let details = json!({
        "email": new_user.email,
        "summary": format!("New client registered: {}", new_user.full_name)
    });
    let _ = crate::audit::log(&pool, user_id, "user.registered", "user", user_id, details).await;

    Ok(response::created(json!({ "user_id": user_id }), "User registered successfully"))
}

pub async fn current_user(
    pool: web::Data<DbPool>,
    config: web::Data<AppConfig>,
    session: Session,
) -> Result<HttpResponse, AppError> {
    let user_id = session::require_live(&session, config.session_timeout_secs)?;
    let found = user::find_display_by_id(&pool, user_id)
        .await?
        .filter(|u| u.status != UserStatus::Deleted.as_str());
    let Some(u) = found else {
        session.purge();
        return Err(AppError::Unauthorized("Not authenticated".to_string()));
    };
    Ok(response::success(UserSummary::from(u), "Success"))
}
