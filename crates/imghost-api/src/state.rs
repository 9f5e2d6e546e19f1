//! Application state shared by every handler.

use crate::auth::JwtService;
use crate::middleware::RateLimiter;
use crate::services::{GuestCodeService, ImageService, IngestionPipeline, SystemService, UserService};
use imghost_core::Config;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub jwt: Arc<JwtService>,
    pub rate_limiter: Arc<RateLimiter>,
    pub pipeline: Arc<IngestionPipeline>,
    pub images: ImageService,
    pub guest_codes: Arc<GuestCodeService>,
    pub users: Arc<UserService>,
    pub system: Arc<SystemService>,
}
