//! Storage setup

use anyhow::{Context, Result};
use imghost_core::Config;
use imghost_storage::Storage;
use std::sync::Arc;

pub async fn setup_storage(config: &Config) -> Result<Arc<dyn Storage>> {
    let storage = imghost_storage::create_storage(config)
        .await
        .context("Failed to initialize storage")?;

    tracing::info!(
        backend = ?config.storage_backend(),
        active = ?storage.backend_type(),
        upload_path = %config.upload_path(),
        "Storage initialized"
    );
    Ok(storage)
}
