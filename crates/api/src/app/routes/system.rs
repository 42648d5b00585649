use axum::{Json, http::StatusCode, response::IntoResponse};

pub async fn root() -> impl IntoResponse {
    Json(serde_json::json!({
        "success": true,
        "message": "Server is running",
    }))
}

pub async fn health() -> StatusCode {
    StatusCode::OK
}
