use crate::constants::SERVICE_NAME;
use axum::{response::IntoResponse, Json};
use chrono::Utc;
use serde::Serialize;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: i64,
    pub service: &'static str,
}

/// Liveness only: answers as long as the process serves requests.
pub async fn health_check() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        timestamp: Utc::now().timestamp(),
        service: SERVICE_NAME,
    })
}
