//! imghost API Library
//!
//! HTTP handlers, middleware, the upload pipeline, the guest code lifecycle and
//! application setup.

pub mod auth;
pub mod constants;
pub mod error;
mod handlers;
pub mod middleware;
pub mod services;
pub mod setup;
pub mod state;
pub mod telemetry;

pub use error::{ErrorResponse, HttpAppError};
pub use setup::{build_state, seed_default_admin, Stores};
pub use state::AppState;
