//! Application setup and initialization
//!
//! Bootstrap order: telemetry, database, storage, services, routes. The
//! background sweeps are started separately so the caller owns their shutdown
//! signal.

pub mod database;
pub mod routes;
pub mod server;
pub mod storage;

use crate::auth::JwtService;
use crate::middleware::RateLimiter;
use crate::services::{GuestCodeService, ImageService, IngestionPipeline, SystemService, UserService};
use crate::state::AppState;
use crate::telemetry::{init_telemetry, LogFormat};
use anyhow::{Context, Result};
use imghost_core::{Clock, Config, SystemClock};
use imghost_db::{
    GuestCodeStore, ImageStore, PgGuestCodeStore, PgImageStore, PgStatsStore, PgUserStore,
    StatsStore, UserStore,
};
use imghost_processing::{ImageProcessor, MediaValidator};
use imghost_storage::Storage;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// The metadata repositories the services run against.
#[derive(Clone)]
pub struct Stores {
    pub images: Arc<dyn ImageStore>,
    pub stats: Arc<dyn StatsStore>,
    pub guest_codes: Arc<dyn GuestCodeStore>,
    pub users: Arc<dyn UserStore>,
}

/// Initialize the entire application
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    config.validate().context("Configuration validation failed")?;

    init_telemetry(LogFormat::from_env())
        .map_err(|e| anyhow::anyhow!("Failed to initialize telemetry: {}", e))?;

    tracing::info!(
        environment = %config.environment(),
        "Configuration loaded and validated successfully"
    );

    let pool = database::setup_database(&config).await?;
    let stores = Stores {
        images: Arc::new(PgImageStore::new(pool.clone())),
        stats: Arc::new(PgStatsStore::new(pool.clone())),
        guest_codes: Arc::new(PgGuestCodeStore::new(pool.clone())),
        users: Arc::new(PgUserStore::new(pool)),
    };

    let storage = storage::setup_storage(&config).await?;

    let state = build_state(config, stores, storage, Arc::new(SystemClock));
    seed_default_admin(&state).await?;

    if state.config.trusted_proxies().is_none() && state.config.is_production() {
        tracing::warn!(
            "TRUSTED_PROXIES allows every peer - client IPs can be spoofed with X-Forwarded-For"
        );
    }

    let router = routes::setup_routes(state.clone())?;

    Ok((state, router))
}

/// Wire services over already constructed stores and storage.
pub fn build_state(
    config: Config,
    stores: Stores,
    storage: Arc<dyn Storage>,
    clock: Arc<dyn Clock>,
) -> Arc<AppState> {
    let validator = MediaValidator::new(
        config.max_file_size_bytes(),
        config.allowed_content_types().to_vec(),
    );

    let pipeline = IngestionPipeline::new(
        validator,
        ImageProcessor::new(),
        storage.clone(),
        stores.images.clone(),
        stores.stats.clone(),
        clock.clone(),
    );

    let images = ImageService::new(stores.images.clone(), storage.clone(), clock.clone());
    let system = SystemService::new(
        stores.images.clone(),
        clock.clone(),
        PathBuf::from(config.upload_path()),
    );

    let guest_codes = GuestCodeService::new(
        stores.guest_codes.clone(),
        stores.images.clone(),
        storage,
        clock,
        config.default_admin().to_string(),
    );

    let jwt = JwtService::new(config.jwt_secret(), config.jwt_expiry_hours());
    let rate_limiter = RateLimiter::new(
        config.rate_limit_per_minute(),
        Duration::from_secs(config.rate_limit_window_secs()),
    );

    Arc::new(AppState {
        config,
        jwt: Arc::new(jwt),
        rate_limiter: Arc::new(rate_limiter),
        pipeline: Arc::new(pipeline),
        images,
        guest_codes: Arc::new(guest_codes),
        users: Arc::new(UserService::new(stores.users)),
        system: Arc::new(system),
    })
}

/// Create the configured administrator account on first start.
pub async fn seed_default_admin(state: &AppState) -> Result<()> {
    state
        .users
        .ensure_default_admin(state.config.default_admin(), state.config.admin_password())
        .await
        .context("Failed to create the administrator account")?;
    Ok(())
}

/// Start the guest code sweep and the rate limiter sweep. Both stop when
/// `shutdown` flips to true.
pub fn start_background_tasks(
    state: &AppState,
    shutdown: watch::Receiver<bool>,
) -> Vec<JoinHandle<()>> {
    let sweep_period = Duration::from_secs(state.config.guest_sweep_interval_secs());
    tracing::info!(
        interval_secs = sweep_period.as_secs(),
        "Starting guest code expiry sweep"
    );

    vec![
        state
            .guest_codes
            .clone()
            .start_sweep(sweep_period, shutdown.clone()),
        state.rate_limiter.clone().start_sweep(shutdown),
    ]
}
