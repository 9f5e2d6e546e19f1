use crate::error::HttpAppError;
use crate::state::AppState;
use axum::{extract::State, response::IntoResponse, Extension, Json};
use imghost_core::models::Principal;
use imghost_core::AppError;
use std::sync::Arc;

/// Uptime, disk capacity and file size aggregates. Accounts only.
#[tracing::instrument(skip(state), fields(username = %principal.username))]
pub async fn system_status(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
) -> Result<impl IntoResponse, HttpAppError> {
    if principal.is_guest() {
        return Err(AppError::Forbidden("Guests cannot view system status".to_string()).into());
    }
    let status = state.system.status().await?;
    Ok(Json(status))
}
