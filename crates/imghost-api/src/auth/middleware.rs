use crate::auth::jwt::JwtService;
use crate::error::HttpAppError;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use imghost_core::models::Principal;
use imghost_core::AppError;
use std::sync::Arc;

/// Resolve `Authorization: Bearer <jwt>` into a [`Principal`] request extension.
pub async fn auth_middleware(
    State(jwt): State<Arc<JwtService>>,
    mut request: Request,
    next: Next,
) -> Response {
    let auth_header = match request
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
    {
        Some(h) => h,
        None => {
            return HttpAppError(AppError::Unauthorized(
                "Missing authorization header".to_string(),
            ))
            .into_response();
        }
    };

    let Some(token) = auth_header.strip_prefix("Bearer ") else {
        return HttpAppError(AppError::Unauthorized(
            "Invalid authorization header format".to_string(),
        ))
        .into_response();
    };

    match jwt.verify(token.trim()) {
        Ok(claims) => {
            tracing::debug!(username = %claims.username, "Request authenticated");
            request
                .extensions_mut()
                .insert(Principal::new(claims.username));
            next.run(request).await
        }
        Err(e) => HttpAppError(e).into_response(),
    }
}
