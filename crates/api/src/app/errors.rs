use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;
use tracing::error;

use wabulk_infra::jobs::{LedgerError, SubmitError};
use wabulk_infra::provider::ProviderError;

pub const JOB_NOT_FOUND: &str = "Job not found";
pub const PROVIDER_NOT_CONFIGURED: &str = "WhatsApp API config missing";

pub fn json_error(status: StatusCode, message: impl Into<String>) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "success": false,
            "error": message.into(),
        })),
    )
        .into_response()
}

pub fn submit_error_to_response(err: SubmitError) -> axum::response::Response {
    match err {
        SubmitError::NoContacts | SubmitError::Invalid(_) => {
            json_error(StatusCode::BAD_REQUEST, err.to_string())
        }
        SubmitError::ProviderNotConfigured => {
            json_error(StatusCode::INTERNAL_SERVER_ERROR, PROVIDER_NOT_CONFIGURED)
        }
        SubmitError::Ledger(e) => ledger_error_to_response(e),
    }
}

pub fn ledger_error_to_response(err: LedgerError) -> axum::response::Response {
    match err {
        LedgerError::NotFound(_) => json_error(StatusCode::NOT_FOUND, JOB_NOT_FOUND),
        other => {
            error!(error = %other, "job ledger failure");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, other.to_string())
        }
    }
}

/// Upstream status when the provider answered, 500 otherwise.
pub fn provider_error_to_response(err: ProviderError) -> axum::response::Response {
    if let ProviderError::NotConfigured(_) = err {
        return json_error(StatusCode::INTERNAL_SERVER_ERROR, PROVIDER_NOT_CONFIGURED);
    }

    let status = err
        .http_status()
        .and_then(|s| StatusCode::from_u16(s).ok())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let message = err.detail().unwrap_or_else(|| err.to_string());
    json_error(status, message)
}
