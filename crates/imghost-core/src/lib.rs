//! imghost Core Library
//!
//! This crate provides core domain models, error types, configuration and the
//! clock abstraction shared across all imghost components.

pub mod clock;
pub mod config;
pub mod error;
pub mod models;
pub mod storage_types;

// Re-export commonly used types
pub use clock::{Clock, SystemClock};
pub use config::Config;
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use storage_types::StorageBackend;
