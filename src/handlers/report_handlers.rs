use actix_session::Session;
use actix_web::{HttpResponse, web};
use serde::Deserialize;
use serde_json::json;

use crate::auth::session::{SessionUser, require_staff};
use crate::auth::validate;
use crate::db::DbPool;
use crate::errors::AppError;
use crate::models::account;
use crate::models::common::non_blank;
use crate::models::report::{self, Report, ReportKind};
use crate::models::transaction;
use crate::response;

#[derive(Debug, Deserialize)]
pub struct ReportQuery {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
}

impl ReportQuery {
    fn parse(&self) -> Result<(ReportKind, Option<&str>, Option<&str>), AppError> {
        let kind = non_blank(self.kind.as_deref())
            .ok_or_else(|| AppError::BadRequest("Report type is required".to_string()))?
            .parse::<ReportKind>()
            .map_err(AppError::BadRequest)?;

        let start = non_blank(self.start.as_deref());
        let end = non_blank(self.end.as_deref());
        let errors: Vec<String> = [
            start.and_then(|s| validate::validate_date(s, "Start date")),
            end.and_then(|e| validate::validate_date(e, "End date")),
        ]
        .into_iter()
        .flatten()
        .collect();
        if !errors.is_empty() {
            return Err(AppError::Validation(errors));
        }
        if matches!((start, end), (Some(s), Some(e)) if s > e) {
            return Err(AppError::BadRequest("Start date must not be after end date".to_string()));
        }
        Ok((kind, start, end))
    }
}

/// Compute the report and record that it was generated.
async fn build(pool: &DbPool, actor: &SessionUser, query: &ReportQuery) -> Result<Report, AppError> {
    let (kind, start, end) = query.parse()?;

    let txns = transaction::find_posted_between(pool, start, end).await?;
    let types = account::type_map(pool).await?;
    let report = report::generate(kind, &txns, &types, start, end);

    let id = report::record(pool, kind, actor.id).await?;
    log::info!("{} generated by '{}' ({} transactions)", kind.title(), actor.username, txns.len());

    let details = json!({
        "start": start,
        "end": end,
        "summary": format!("Generated {}", kind.title())
    });
    let _ = crate::audit::log(pool, actor.id, "report.generated", "report", id, details).await;

    Ok(report)
}

/// GET /api/reports?type=income|balance|trial&start=&end=
pub async fn generate(
    pool: web::Data<DbPool>,
    session: Session,
    query: web::Query<ReportQuery>,
) -> Result<HttpResponse, AppError> {
    let actor = require_staff(&session)?;
    let report = build(&pool, &actor, &query).await?;
    Ok(response::success(report, "Report generated successfully"))
}

/// GET /api/reports/export, same parameters, CSV body.
pub async fn export(
    pool: web::Data<DbPool>,
    session: Session,
    query: web::Query<ReportQuery>,
) -> Result<HttpResponse, AppError> {
    let actor = require_staff(&session)?;
    let report = build(&pool, &actor, &query).await?;
    Ok(response::csv_attachment(&report.file_name(), report.to_csv()))
}
