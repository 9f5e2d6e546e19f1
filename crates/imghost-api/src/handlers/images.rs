use crate::error::HttpAppError;
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use imghost_core::AppError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct PaginationQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Serialize)]
pub struct DeleteResponse {
    pub deleted: bool,
}

fn parse_image_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::BadRequest("Invalid image id".to_string()))
}

#[tracing::instrument(skip(state), fields(operation = "list_images"))]
pub async fn list_images(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PaginationQuery>,
) -> Result<impl IntoResponse, HttpAppError> {
    let images = state.images.list(query.limit, query.offset).await?;
    Ok(Json(images))
}

#[tracing::instrument(skip(state), fields(operation = "get_image"))]
pub async fn get_image(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, HttpAppError> {
    let image = state.images.get(parse_image_id(&id)?).await?;
    Ok(Json(image))
}

#[tracing::instrument(skip(state), fields(operation = "delete_image"))]
pub async fn delete_image(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, HttpAppError> {
    state.images.delete(parse_image_id(&id)?).await?;
    Ok(Json(DeleteResponse { deleted: true }))
}
