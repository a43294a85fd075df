pub mod account_handlers;
pub mod auth_handlers;
pub mod client_handlers;
pub mod dashboard;
pub mod department_handlers;
pub mod feedback_handlers;
pub mod invoice_handlers;
pub mod report_handlers;
pub mod task_handlers;
pub mod transaction_handlers;
pub mod upload_handlers;
pub mod user_handlers;

use actix_cors::Cors;
use actix_web::{
    Error, HttpResponse, ResponseError,
    body::MessageBody,
    dev::{ServiceRequest, ServiceResponse},
    http::{Method, header},
    middleware::{Next, from_fn},
    web,
};

use crate::auth::middleware::require_auth;
use crate::config::AppConfig;
use crate::errors::AppError;

/// CSRF guard for mutation endpoints.
///
/// POST/PUT/DELETE requests that carry a body must declare
/// `Content-Type: application/json`. Browsers cannot send cross-origin JSON
/// with cookies from a plain form, so this stands in for CSRF tokens.
pub async fn require_json_content_type(
    req: ServiceRequest,
    next: Next<impl MessageBody + 'static>,
) -> Result<ServiceResponse<impl MessageBody>, Error> {
    let is_mutation = matches!(*req.method(), Method::POST | Method::PUT | Method::DELETE);
    let has_body = req.headers().contains_key(header::TRANSFER_ENCODING)
        || req
            .headers()
            .get(header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok())
            .is_some_and(|len| len > 0);

    if is_mutation && has_body {
        let content_type = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");

        if !content_type.starts_with("application/json") {
            let err = AppError::BadRequest(
                "Content-Type must be application/json for mutation requests".to_string(),
            );
            return Ok(req.into_response(err.error_response()).map_into_right_body());
        }
    }

    next.call(req).await.map(|res| res.map_into_left_body())
}

/// Cross-origin policy: one trusted origin with credentials, or permissive
/// when none is configured.
pub fn cors(allowed_origin: Option<&str>) -> Cors {
    match allowed_origin {
        Some(origin) => Cors::default()
            .allowed_origin(origin)
            .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
            .allowed_headers(vec![
                header::CONTENT_TYPE,
                header::AUTHORIZATION,
                header::ACCEPT,
                header::HeaderName::from_static("x-requested-with"),
            ])
            .supports_credentials()
            .max_age(3600),
        None => Cors::permissive(),
    }
}

async fn health(config: web::Data<AppConfig>) -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "ok",
        "app": config.app_name,
        "version": config.app_version,
    }))
}

/// Fallback for unknown routes.
pub async fn not_found() -> HttpResponse {
    AppError::NotFound("Endpoint not found".to_string()).error_response()
}

/// Register every route. Shared by the server and the integration tests.
pub fn configure(cfg: &mut web::ServiceConfig) {
    let json_config = web::JsonConfig::default()
        .error_handler(|err, _req| AppError::BadRequest(format!("Invalid JSON body: {err}")).into());
    let query_config = web::QueryConfig::default()
        .error_handler(|err, _req| AppError::BadRequest(format!("Invalid query string: {err}")).into());
    let path_config = web::PathConfig::default()
        .error_handler(|err, _req| AppError::BadRequest(format!("Invalid path: {err}")).into());

    cfg.app_data(json_config)
        .app_data(query_config)
        .app_data(path_config)
        .route("/health", web::get().to(health))
        .service(
            web::scope("/api")
                // Public
                .service(
                    web::scope("/auth")
                        .wrap(from_fn(require_json_content_type))
                        .route("/login", web::post().to(auth_handlers::login))
                        .route("/logout", web::post().to(auth_handlers::logout))
                        .route("/register", web::post().to(auth_handlers::register))
                        .route("/current-user", web::get().to(auth_handlers::current_user))
                        .route("/current-user", web::post().to(auth_handlers::current_user)),
                )
                .service(
                    web::scope("/feedback")
                        .wrap(from_fn(require_json_content_type))
                        .route("", web::get().to(feedback_handlers::stats))
                        .route("", web::post().to(feedback_handlers::submit)),
                )
                // Multipart, so no JSON guard
                .service(
                    web::scope("/upload")
                        .wrap(from_fn(require_auth))
                        .route("", web::post().to(upload_handlers::upload)),
                )
                // Protected
                .service(
                    web::scope("")
                        .wrap(from_fn(require_json_content_type))
                        .wrap(from_fn(require_auth))
                        .route("/users", web::get().to(user_handlers::list))
                        .route("/users", web::post().to(user_handlers::create))
                        .route("/users/{id}", web::get().to(user_handlers::read))
                        .route("/users/{id}", web::put().to(user_handlers::update))
                        .route("/users/{id}", web::delete().to(user_handlers::delete))
                        .route("/departments", web::get().to(department_handlers::list))
                        .route("/departments", web::post().to(department_handlers::create))
                        .route("/departments/{id}", web::get().to(department_handlers::read))
                        .route("/departments/{id}", web::put().to(department_handlers::update))
                        .route("/departments/{id}", web::delete().to(department_handlers::delete))
                        .route("/accounts", web::get().to(account_handlers::list))
                        .route("/accounts", web::post().to(account_handlers::create))
                        .route("/accounts/{id}", web::get().to(account_handlers::read))
                        .route("/accounts/{id}", web::put().to(account_handlers::update))
                        .route("/accounts/{id}", web::delete().to(account_handlers::delete))
                        .route("/transactions", web::get().to(transaction_handlers::list))
                        .route("/transactions", web::post().to(transaction_handlers::create))
                        .route("/transactions/{id}", web::get().to(transaction_handlers::read))
                        .route("/transactions/{id}", web::put().to(transaction_handlers::update))
                        .route("/transactions/{id}", web::delete().to(transaction_handlers::delete))
                        // /reports/export BEFORE any /reports/{..}
                        .route("/reports", web::get().to(report_handlers::generate))
                        .route("/reports/export", web::get().to(report_handlers::export))
                        // /invoices/export and /invoices/pay BEFORE /invoices/{id}
                        .route("/invoices", web::get().to(invoice_handlers::list))
                        .route("/invoices", web::post().to(invoice_handlers::create))
                        .route("/invoices/export", web::get().to(invoice_handlers::export))
                        .route("/invoices/pay", web::post().to(invoice_handlers::pay))
                        .route("/invoices/{id}", web::get().to(invoice_handlers::read))
                        .route("/documents", web::get().to(upload_handlers::list))
                        .route("/clients", web::get().to(client_handlers::list))
                        .route("/clients", web::post().to(client_handlers::create))
                        .route("/tasks", web::get().to(task_handlers::list))
                        .route("/tasks", web::post().to(task_handlers::create))
                        .route("/tasks/{id}", web::put().to(task_handlers::update))
                        .route("/dashboard/stats", web::get().to(dashboard::stats))
                        .route("/dashboard/activity", web::get().to(dashboard::activity))
                        .route("/dashboard/status", web::get().to(dashboard::status)),
                ),
        );
}
