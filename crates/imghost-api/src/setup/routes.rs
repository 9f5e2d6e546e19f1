//! Route configuration and setup

use crate::constants::{API_PREFIX, MULTIPART_OVERHEAD_BYTES};
use crate::handlers;
use crate::middleware::rate_limit_middleware;
use crate::services::MAX_BATCH_FILES;
use crate::state::AppState;
use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    routing::{delete, get, post},
    Router,
};
use imghost_core::Config;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

/// Setup all application routes
pub fn setup_routes(state: Arc<AppState>) -> Result<Router<()>, anyhow::Error> {
    let config = &state.config;
    let cors = setup_cors(config)?;

    let protected_routes = protected_routes().layer(axum::middleware::from_fn_with_state(
        state.jwt.clone(),
        crate::auth::auth_middleware,
    ));

    // A full batch plus multipart framing.
    let body_limit = config
        .max_file_size_bytes()
        .saturating_mul(MAX_BATCH_FILES)
        .saturating_add(MULTIPART_OVERHEAD_BYTES);

    // Outermost layer is added last.
    let app = public_routes()
        .merge(protected_routes)
        .nest_service("/uploads", ServeDir::new(config.upload_path()))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    Ok(app)
}

fn public_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route(
            &format!("{}/auth/login", API_PREFIX),
            post(handlers::auth::login),
        )
        .route(
            &format!("{}/auth/guest", API_PREFIX),
            post(handlers::auth::guest_login),
        )
}

fn protected_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            &format!("{}/auth/me", API_PREFIX),
            get(handlers::auth::me),
        )
        .route(
            &format!("{}/auth/change-password", API_PREFIX),
            post(handlers::auth::change_password),
        )
        .route(
            &format!("{}/upload", API_PREFIX),
            post(handlers::upload::upload_image),
        )
        .route(
            &format!("{}/upload/batch", API_PREFIX),
            post(handlers::upload::upload_batch),
        )
        .route(
            &format!("{}/images", API_PREFIX),
            get(handlers::images::list_images),
        )
        .route(
            &format!("{}/images/{{id}}", API_PREFIX),
            get(handlers::images::get_image).delete(handlers::images::delete_image),
        )
        .route(
            &format!("{}/stats", API_PREFIX),
            get(handlers::stats::get_stats),
        )
        .route(
            &format!("{}/system/status", API_PREFIX),
            get(handlers::system::system_status),
        )
        .route(
            &format!("{}/guest-codes", API_PREFIX),
            post(handlers::guest_codes::create_guest_code)
                .get(handlers::guest_codes::list_guest_codes),
        )
        .route(
            &format!("{}/guest-codes/{{id}}", API_PREFIX),
            delete(handlers::guest_codes::delete_guest_code),
        )
}

/// Setup CORS configuration
fn setup_cors(config: &Config) -> Result<CorsLayer, anyhow::Error> {
    let methods = [Method::GET, Method::POST, Method::DELETE, Method::OPTIONS];

    let cors = if config.cors_origins().iter().any(|o| o == "*") {
        if config.is_production() {
            tracing::warn!("CORS configured to allow all origins - not recommended for production");
        }
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(methods)
            .allow_headers(Any)
    } else {
        let origins = config
            .cors_origins()
            .iter()
            .map(|o| o.parse::<HeaderValue>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| anyhow::anyhow!("Invalid CORS origin: {}", e))?;

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(methods)
            .allow_headers(Any)
    };
    Ok(cors)
}
