use crate::error::{HttpAppError, ValidatedJson};
use crate::state::AppState;
use axum::{extract::State, response::IntoResponse, Extension, Json};
use imghost_core::models::Principal;
use imghost_core::AppError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct GuestLoginRequest {
    pub code: String,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub username: String,
    pub guest: bool,
}

#[derive(Debug, Serialize)]
pub struct ChangePasswordResponse {
    pub changed: bool,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
    pub username: String,
    /// Unix seconds.
    pub expires: i64,
}

/// Password login against the account table.
#[tracing::instrument(skip(state, request), fields(username = %request.username))]
pub async fn login(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<LoginRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let user = state
        .users
        .authenticate(&request.username, &request.password)
        .await
        .inspect_err(|_| tracing::warn!("Failed login attempt"))?;

    let (token, expires) = state.jwt.issue(&user.username)?;
    tracing::info!("User logged in");

    Ok(Json(TokenResponse {
        token,
        username: user.username,
        expires,
    }))
}

/// The identity the bearer token resolves to.
pub async fn me(Extension(principal): Extension<Principal>) -> impl IntoResponse {
    Json(MeResponse {
        guest: principal.is_guest(),
        username: principal.username,
    })
}

#[tracing::instrument(skip(state, request), fields(username = %principal.username))]
pub async fn change_password(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    ValidatedJson(request): ValidatedJson<ChangePasswordRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    state
        .users
        .change_password(&principal, &request.old_password, &request.new_password)
        .await?;
    Ok(Json(ChangePasswordResponse { changed: true }))
}

/// Redeem a guest code for a token scoped to `guest:<id>`.
pub async fn guest_login(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<GuestLoginRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    if request.code.trim().is_empty() {
        return Err(AppError::BadRequest("Invalid code".to_string()).into());
    }

    let code = state.guest_codes.redeem(&request.code).await?;
    let username = code.identity();
    let (token, expires) = state.jwt.issue(&username)?;

    Ok(Json(TokenResponse {
        token,
        username,
        expires,
    }))
}
