use axum::{Json, response::IntoResponse};
use http::StatusCode;
use serde::Serialize;

/// Fixed liveness message
pub const STATUS_MESSAGE: &str = "ReVision AI Backend is Running!";

#[derive(Debug, Serialize)]
struct StatusBody {
    message: &'static str,
}

/// Health check handler
pub async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(StatusBody { message: STATUS_MESSAGE }))
}
