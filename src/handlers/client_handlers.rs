use actix_session::Session;
use actix_web::{HttpResponse, web};
use serde_json::json;

use crate::auth::session::require_staff;
use crate::auth::validate;
use crate::db::DbPool;
use crate::errors::AppError;
use crate::models::client::{self, ClientForm};
use crate::models::common::non_blank;
use crate::models::user;
use crate::response;

pub async fn list(pool: web::Data<DbPool>, session: Session) -> Result<HttpResponse, AppError> {
    require_staff(&session)?;
    let clients = client::find_all(&pool).await?;
    Ok(response::success(clients, "Clients retrieved successfully"))
}

pub async fn create(
    pool: web::Data<DbPool>,
    session: Session,
    body: web::Json<ClientForm>,
) -> Result<HttpResponse, AppError> {
    let actor = require_staff(&session)?;

    let company = body.company_name.as_deref().unwrap_or_default();
    let mut errors: Vec<String> = [
        validate::validate_required(company, "Company name", 150),
        validate::validate_optional(body.contact_person.as_deref().unwrap_or_default(), "Contact person", 100),
    ]
    .into_iter()
    .flatten()
    .collect();
    if let Some(email) = non_blank(body.email.as_deref()) {
        errors.extend(validate::validate_email(email));
    }
    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }

    if let Some(user_id) = body.user_id {
        if user::find_by_id(&pool, user_id).await?.is_none() {
            return Err(AppError::BadRequest("Linked user not found".to_string()));
        }
    }

    let id = client::create(&pool, &body).await?;

    let details = json!({ "summary": format!("Added client '{}'", company.trim()) });
    let _ = crate::audit::log(&pool, actor.id, "client.created", "client", id, details).await;

    Ok(response::created(json!({ "id": id }), "Client created successfully"))
}
