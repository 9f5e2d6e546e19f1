use crate::error::{HttpAppError, ValidatedJson};
use crate::services::ExpirySpec;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Extension, Json,
};
use imghost_core::models::Principal;
use serde::Serialize;
use std::sync::Arc;

#[derive(Serialize)]
pub struct DeleteGuestCodeResponse {
    pub deleted: bool,
}

#[tracing::instrument(skip(state, spec), fields(username = %principal.username))]
pub async fn create_guest_code(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    ValidatedJson(spec): ValidatedJson<ExpirySpec>,
) -> Result<impl IntoResponse, HttpAppError> {
    let code = state.guest_codes.generate(&principal, &spec).await?;
    Ok(Json(code))
}

pub async fn list_guest_codes(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
) -> Result<impl IntoResponse, HttpAppError> {
    let codes = state.guest_codes.list(&principal).await?;
    Ok(Json(codes))
}

#[tracing::instrument(skip(state), fields(username = %principal.username))]
pub async fn delete_guest_code(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, HttpAppError> {
    let deleted = state.guest_codes.delete(&principal, id).await?;
    Ok(Json(DeleteGuestCodeResponse { deleted }))
}
