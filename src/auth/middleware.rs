use actix_session::SessionExt;
use actix_web::{
    Error, ResponseError,
    body::MessageBody,
    dev::{ServiceRequest, ServiceResponse},
    middleware::Next,
    web,
};

use crate::auth::session;
use crate::config::AppConfig;

/// Rejects requests without a live session with a JSON 401.
/// Sessions older than the configured timeout are purged.
pub async fn require_auth(
    req: ServiceRequest,
    next: Next<impl MessageBody + 'static>,
) -> Result<ServiceResponse<impl MessageBody>, Error> {
    let session = req.get_session();
    let timeout = req
        .app_data::<web::Data<AppConfig>>()
        .map(|cfg| cfg.session_timeout_secs)
        .unwrap_or_else(|| AppConfig::default().session_timeout_secs);

    if let Err(err) = session::require_live(&session, timeout) {
        let response = err.error_response();
        return Ok(req.into_response(response).map_into_right_body());
    }

    next.call(req).await.map(|res| res.map_into_left_body())
}
