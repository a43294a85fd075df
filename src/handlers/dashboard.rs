use actix_session::Session;
use actix_web::{HttpResponse, web};

use crate::audit;
use crate::auth::session::require_staff;
use crate::db::DbPool;
use crate::errors::AppError;
use crate::models::dashboard;
use crate::response;

const RECENT_ACTIVITY_LIMIT: i64 = 10;

pub async fn stats(pool: web::Data<DbPool>, session: Session) -> Result<HttpResponse, AppError> {
    require_staff(&session)?;
    let stats = dashboard::stats(&pool).await?;
    Ok(response::success(stats, "Success"))
}

pub async fn activity(pool: web::Data<DbPool>, session: Session) -> Result<HttpResponse, AppError> {
    require_staff(&session)?;
    let recent = audit::find_recent(&pool, RECENT_ACTIVITY_LIMIT).await?;
    Ok(response::success(recent, "Success"))
}

pub async fn status(pool: web::Data<DbPool>, session: Session) -> Result<HttpResponse, AppError> {
    require_staff(&session)?;
    let status = dashboard::system_status(&pool).await?;
    Ok(response::success(status, "Success"))
}
