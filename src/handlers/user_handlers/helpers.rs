use serde::Deserialize;

use crate::auth::session::SessionUser;
use crate::auth::validate;
use crate::errors::AppError;
use crate::models::user::{Role, UserStatus};

/// Body of POST and PUT /api/users. Every field is optional so PUT can be partial.
#[derive(Debug, Default, Deserialize)]
pub struct UserRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub full_name: Option<String>,
    pub role: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub search: Option<String>,
}

/// Present and non-blank.
pub fn provided(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

/// First required field that is missing, as "Field {name} is required".
pub fn missing_required(body: &UserRequest) -> Option<String> {
    [
        ("username", &body.username),
        ("email", &body.email),
        ("password", &body.password),
        ("full_name", &body.full_name),
    ]
    .into_iter()
    .find(|(_, value)| provided(value).is_none())
    .map(|(name, _)| format!("Field {name} is required"))
}

/// Format checks for whichever fields are present.
pub fn validate_user_fields(body: &UserRequest) -> Vec<String> {
    let mut errors = vec![];
    if let Some(username) = provided(&body.username) {
        errors.extend(validate::validate_username(username));
    }
    if let Some(email) = provided(&body.email) {
        errors.extend(validate::validate_email(email));
    }
    if let Some(pw) = provided(&body.password) {
        errors.extend(validate::validate_password(pw));
    }
    if let Some(name) = provided(&body.full_name) {
        errors.extend(validate::validate_required(name, "Full name", 100));
    }
    errors
}

pub fn parse_role(raw: Option<&str>) -> Result<Option<Role>, AppError> {
    raw.map(|r| r.parse::<Role>().map_err(AppError::BadRequest))
        .transpose()
}

pub fn parse_status(raw: Option<&str>) -> Result<Option<UserStatus>, AppError> {
    raw.map(|s| s.parse::<UserStatus>().map_err(AppError::BadRequest))
        .transpose()
}

/// Co-Admins manage clients and each other, but only an Admin may hand out Admin.
pub fn ensure_can_assign(actor: &SessionUser, role: Option<Role>) -> Result<(), AppError> {
    if role == Some(Role::Admin) && actor.role != Role::Admin {
        return Err(AppError::PermissionDenied(format!(
            "{} may not assign the Admin role",
            actor.username
        )));
    }
    Ok(())
}
