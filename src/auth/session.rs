use actix_session::Session;
use serde::Serialize;

use crate::errors::AppError;
use crate::models::user::Role;
use crate::time;

pub const USER_ID: &str = "user_id";
pub const USERNAME: &str = "username";
pub const ROLE: &str = "role";
pub const LOGIN_TIME: &str = "login_time";

/// Identity stored in the session cookie at login.
#[derive(Debug, Clone, Serialize)]
pub struct SessionUser {
    pub id: i64,
    pub username: String,
    pub role: Role,
    pub login_time: i64,
}

impl SessionUser {
    pub fn is_staff(&self) -> bool {
        self.role.is_staff()
    }
}

pub fn get_user_id(session: &Session) -> Option<i64> {
    session.get::<i64>(USER_ID).unwrap_or(None)
}

pub fn get_login_time(session: &Session) -> Option<i64> {
    session.get::<i64>(LOGIN_TIME).unwrap_or(None)
}

/// Start a fresh session for a user who just authenticated.
pub fn start(session: &Session, user: &SessionUser) -> Result<(), AppError> {
    session.renew();
    let insert_err = |e: actix_session::SessionInsertError| AppError::Session(e.to_string());
    session.insert(USER_ID, user.id).map_err(insert_err)?;
    session.insert(USERNAME, &user.username).map_err(insert_err)?;
    session.insert(ROLE, user.role.as_str()).map_err(insert_err)?;
    session.insert(LOGIN_TIME, user.login_time).map_err(insert_err)?;
    Ok(())
}

/// The logged-in user, or `Session("Not authenticated")`.
pub fn current(session: &Session) -> Result<SessionUser, AppError> {
    let not_authenticated = || AppError::Session("Not authenticated".to_string());
    let id = get_user_id(session).ok_or_else(not_authenticated)?;
    let username = session
        .get::<String>(USERNAME)
        .unwrap_or(None)
        .ok_or_else(not_authenticated)?;
    let role = session
        .get::<String>(ROLE)
        .unwrap_or(None)
        .and_then(|r| r.parse::<Role>().ok())
        .ok_or_else(not_authenticated)?;
    let login_time = get_login_time(session).ok_or_else(not_authenticated)?;
    Ok(SessionUser {
        id,
        username,
        role,
        login_time,
    })
}

/// Admin or Co-Admin only.
pub fn require_staff(session: &Session) -> Result<SessionUser, AppError> {
    let user = current(session)?;
    if user.is_staff() {
        Ok(user)
    } else {
        Err(AppError::PermissionDenied(format!(
            "{} may not access staff routes",
            user.username
        )))
    }
}

pub fn is_expired(login_time: i64, now: i64, timeout_secs: i64) -> bool {
    now - login_time > timeout_secs
}

/// User id of a session that is logged in and not past `timeout_secs`.
/// An expired session is purged.
pub fn require_live(session: &Session, timeout_secs: i64) -> Result<i64, AppError> {
    match (get_user_id(session), get_login_time(session)) {
        (Some(_), Some(login_time)) if is_expired(login_time, time::unix_now(), timeout_secs) => {
            session.purge();
            Err(AppError::Session("Session expired".to_string()))
        }
        (Some(user_id), Some(_)) => Ok(user_id),
        _ => Err(AppError::Session("Authentication required".to_string())),
    }
}
