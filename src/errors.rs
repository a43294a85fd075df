use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use std::fmt;

use crate::response::ApiError;

#[derive(Debug)]
pub enum AppError {
    Db(sqlx::Error),
    Io(std::io::Error),
    Hash(String),
    Session(String),
    Unauthorized(String),
    PermissionDenied(String),
    NotFound(String),
    BadRequest(String),
    Validation(Vec<String>),
    Conflict(String),
    PayloadTooLarge(String),
    TooManyRequests(String),
}

impl AppError {
    /// Message shown to the client. Internal failures stay generic.
    pub fn public_message(&self) -> String {
        match self {
            AppError::Db(_) | AppError::Io(_) | AppError::Hash(_) => {
                "Internal server error".to_string()
            }
            AppError::Session(msg)
            | AppError::Unauthorized(msg)
            | AppError::NotFound(msg)
            | AppError::BadRequest(msg)
            | AppError::Conflict(msg)
            | AppError::PayloadTooLarge(msg)
            | AppError::TooManyRequests(msg) => msg.clone(),
            AppError::PermissionDenied(_) => "Insufficient permissions".to_string(),
            AppError::Validation(errs) => errs.join("; "),
        }
    }

    fn errors(&self) -> Vec<String> {
        match self {
            AppError::Validation(errs) => errs.clone(),
            _ => Vec::new(),
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Db(e) => write!(f, "Database error: {e}"),
            AppError::Io(e) => write!(f, "I/O error: {e}"),
            AppError::Hash(e) => write!(f, "Hash error: {e}"),
            AppError::Session(e) => write!(f, "Session error: {e}"),
            AppError::Unauthorized(e) => write!(f, "Unauthorized: {e}"),
            AppError::PermissionDenied(e) => write!(f, "Permission denied: {e}"),
            AppError::NotFound(e) => write!(f, "Not found: {e}"),
            AppError::BadRequest(e) => write!(f, "Bad request: {e}"),
            AppError::Validation(errs) => write!(f, "Validation failed: {}", errs.join("; ")),
            AppError::Conflict(e) => write!(f, "Conflict: {e}"),
            AppError::PayloadTooLarge(e) => write!(f, "Payload too large: {e}"),
            AppError::TooManyRequests(e) => write!(f, "Too many requests: {e}"),
        }
    }
}

impl std::error::Error for AppError {}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Db(_) | AppError::Io(_) | AppError::Hash(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::Session(_) | AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::PermissionDenied(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) | AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::TooManyRequests(_) => StatusCode::TOO_MANY_REQUESTS,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            log::error!("{self}");
        }
        HttpResponse::build(status).json(ApiError::new(self.public_message(), self.errors()))
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        AppError::Db(e)
    }
}

impl From<std::io::Error> for AppError {
    fn from(e: std::io::Error) -> Self {
        AppError::Io(e)
    }
}

/// True when the error is a UNIQUE constraint violation.
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => db.is_unique_violation(),
        _ => false,
    }
}

/// Map a unique violation to `Conflict(msg)`, anything else to `Db`.
pub fn conflict_on_unique(err: sqlx::Error, msg: &str) -> AppError {
    if is_unique_violation(&err) {
        AppError::Conflict(msg.to_string())
    } else {
        AppError::Db(err)
    }
}
