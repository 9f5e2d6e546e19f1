#[cfg(feature = "storage-local")]
use crate::local::{LocalStorage, LOCAL_URL_PREFIX};
#[cfg(feature = "storage-s3")]
use crate::S3Storage;
use crate::{Storage, StorageBackend, StorageError, StorageResult};
use imghost_core::Config;
use std::sync::Arc;

/// Create the storage chain based on configuration.
///
/// With an S3 primary the result is a [`crate::FallbackStorage`] that spills to
/// the local upload directory; with a local primary it is the local backend alone.
pub async fn create_storage(config: &Config) -> StorageResult<Arc<dyn Storage>> {
    #[cfg(not(feature = "storage-local"))]
    {
        let _ = config;
        return Err(StorageError::ConfigError(
            "Local storage backend not available (storage-local feature not enabled)".to_string(),
        ));
    }

    #[cfg(feature = "storage-local")]
    {
        let local: Arc<dyn Storage> = Arc::new(
            LocalStorage::new(config.upload_path(), LOCAL_URL_PREFIX.to_string()).await?,
        );

        match config.storage_backend() {
            StorageBackend::Local => Ok(local),

            #[cfg(feature = "storage-s3")]
            StorageBackend::S3 => {
                let bucket = config.s3_bucket().map(String::from).ok_or_else(|| {
                    StorageError::ConfigError("S3_BUCKET not configured".to_string())
                })?;
                let public_url = config.s3_public_url().map(String::from).ok_or_else(|| {
                    StorageError::ConfigError("S3_PUBLIC_URL not configured".to_string())
                })?;
                let region = config.s3_region().unwrap_or("auto").to_string();
                let endpoint = config.s3_endpoint().map(String::from);

                let remote = S3Storage::new(bucket, region, endpoint, public_url).await?;
                Ok(Arc::new(crate::FallbackStorage::new(Arc::new(remote), local)))
            }

            #[cfg(not(feature = "storage-s3"))]
            StorageBackend::S3 => Err(StorageError::ConfigError(
                "S3 storage backend not available (storage-s3 feature not enabled)".to_string(),
            )),
        }
    }
}
