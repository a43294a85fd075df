//! JSON envelopes shared by every API handler.

use actix_web::HttpResponse;
use serde::Serialize;

use crate::time;

#[derive(Debug, Serialize)]
pub struct ApiSuccess<T: Serialize> {
    pub success: bool,
    pub message: String,
    pub data: T,
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub success: bool,
    pub message: String,
    pub errors: Vec<String>,
    pub timestamp: String,
}

impl ApiError {
    pub fn new(message: impl Into<String>, errors: Vec<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            errors,
            timestamp: time::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub total: i64,
    pub current_page: i64,
    pub per_page: i64,
    pub total_pages: i64,
}

impl Pagination {
    pub fn new(total: i64, current_page: i64, per_page: i64) -> Self {
        let per_page = per_page.max(1);
        let total_pages = (total + per_page - 1) / per_page;
        Self {
            total,
            current_page,
            per_page,
            total_pages,
        }
    }
}

fn envelope<T: Serialize>(data: T, message: &str, pagination: Option<Pagination>) -> ApiSuccess<T> {
    ApiSuccess {
        success: true,
        message: message.to_string(),
        data,
        timestamp: time::now(),
        pagination,
    }
}

pub fn success<T: Serialize>(data: T, message: &str) -> HttpResponse {
    HttpResponse::Ok().json(envelope(data, message, None))
}

pub fn created<T: Serialize>(data: T, message: &str) -> HttpResponse {
    HttpResponse::Created().json(envelope(data, message, None))
}

pub fn paginated<T: Serialize>(data: T, pagination: Pagination, message: &str) -> HttpResponse {
    HttpResponse::Ok().json(envelope(data, message, Some(pagination)))
}

/// CSV download with a `Content-Disposition` attachment header.
pub fn csv_attachment(file_name: &str, body: String) -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/csv; charset=utf-8")
        .insert_header((
            "Content-Disposition",
            format!("attachment; filename=\"{file_name}\""),
        ))
        .body(body)
}

pub fn escape_csv(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}
