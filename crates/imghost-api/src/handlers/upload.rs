use crate::constants::{BATCH_UPLOAD_FIELD, UPLOAD_FIELD};
use crate::error::HttpAppError;
use crate::middleware::ClientIp;
use crate::services::{UploadContext, UploadedFile, MAX_BATCH_FILES};
use crate::state::AppState;
use axum::{
    extract::{multipart::Field, Multipart, State},
    http::{header, HeaderMap},
    response::IntoResponse,
    Extension, Json,
};
use imghost_core::models::Principal;
use imghost_core::AppError;
use std::sync::Arc;

async fn read_field(field: Field<'_>) -> Result<UploadedFile, HttpAppError> {
    let filename = field.file_name().unwrap_or("upload").to_string();
    let content_type = field.content_type().unwrap_or_default().to_string();
    let data = field.bytes().await?;

    Ok(UploadedFile {
        filename,
        content_type,
        data: data.to_vec(),
    })
}

/// Collect the file parts named `name`, ignoring every other part.
///
/// Stops reading one file past `max` so an oversized batch is rejected without
/// buffering the rest of the body.
async fn collect_files(
    multipart: &mut Multipart,
    name: &str,
    max: usize,
) -> Result<Vec<UploadedFile>, HttpAppError> {
    let mut files = Vec::new();
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(name) {
            continue;
        }
        files.push(read_field(field).await?);
        if files.len() > max {
            break;
        }
    }
    Ok(files)
}

async fn upload_context(
    state: &AppState,
    principal: Principal,
    client_ip: Option<String>,
    headers: &HeaderMap,
) -> Result<UploadContext, HttpAppError> {
    state.guest_codes.ensure_active(&principal).await?;

    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(String::from);

    Ok(UploadContext {
        uploaded_by: principal.username,
        client_ip,
        user_agent,
    })
}

#[tracing::instrument(
    skip(state, headers, multipart),
    fields(username = %principal.username, operation = "upload_image")
)]
pub async fn upload_image(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    ClientIp(client_ip): ClientIp,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, HttpAppError> {
    let ctx = upload_context(&state, principal, client_ip, &headers).await?;

    let file = collect_files(&mut multipart, UPLOAD_FIELD, 1)
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| {
            AppError::BadRequest(format!("Missing file field '{}'", UPLOAD_FIELD))
        })?;

    let image = state.pipeline.upload_one(file, &ctx).await?;
    Ok(Json(image))
}

#[tracing::instrument(
    skip(state, headers, multipart),
    fields(username = %principal.username, operation = "upload_batch")
)]
pub async fn upload_batch(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    ClientIp(client_ip): ClientIp,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, HttpAppError> {
    let ctx = upload_context(&state, principal, client_ip, &headers).await?;

    let files = collect_files(&mut multipart, BATCH_UPLOAD_FIELD, MAX_BATCH_FILES).await?;
    let result = state.pipeline.upload_batch(files, &ctx).await?;
    Ok(Json(result))
}
