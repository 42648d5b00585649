use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};

use wabulk_core::JobId;

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/template-message", post(send_template_message))
        .route("/templates", get(list_templates))
        .route("/job/:job_id", get(get_job))
}

/// Queue a bulk send and return its job id right away.
pub async fn send_template_message(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<dto::SendTemplateRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => {
            return errors::json_error(StatusCode::BAD_REQUEST, rejection.body_text());
        }
    };

    let contacts = body.contacts.unwrap_or_default();
    let total_contacts = contacts.len();

    // Dropping the handle detaches the send loop from this request.
    let handle = match services.dispatcher.submit(contacts, body.template) {
        Ok(handle) => handle,
        Err(e) => return errors::submit_error_to_response(e),
    };

    (
        StatusCode::OK,
        Json(dto::JobAccepted::new(handle.id(), total_contacts)),
    )
        .into_response()
}

pub async fn get_job(
    Extension(services): Extension<Arc<AppServices>>,
    Path(job_id): Path<String>,
) -> axum::response::Response {
    let Ok(job_id) = job_id.parse::<JobId>() else {
        return errors::json_error(StatusCode::NOT_FOUND, errors::JOB_NOT_FOUND);
    };

    match services.dispatcher.job(job_id) {
        Ok(Some(job)) => (StatusCode::OK, Json(dto::JobEnvelope::from(job))).into_response(),
        Ok(None) => errors::json_error(StatusCode::NOT_FOUND, errors::JOB_NOT_FOUND),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

/// Message templates registered on the business account.
pub async fn list_templates(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    match services.provider().list_templates().await {
        Ok(data) => (
            StatusCode::OK,
            Json(dto::TemplatesEnvelope {
                success: true,
                data,
            }),
        )
            .into_response(),
        Err(e) => {
            tracing::warn!(error = %e, body = ?e.body(), "template listing failed");
            errors::provider_error_to_response(e)
        }
    }
}
