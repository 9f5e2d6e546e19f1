use crate::error::HttpAppError;
use crate::state::AppState;
use axum::{extract::State, response::IntoResponse, Json};
use std::sync::Arc;

#[tracing::instrument(skip(state), fields(operation = "get_stats"))]
pub async fn get_stats(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpAppError> {
    let summary = state.images.summary().await?;
    Ok(Json(summary))
}
