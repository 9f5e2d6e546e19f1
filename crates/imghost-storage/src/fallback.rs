//! Remote-then-local storage chain.
//!
//! [`FallbackStorage`] wraps a primary backend and a local-disk fallback behind the
//! same [`Storage`] trait. Writes that fail on the primary are retried with the
//! identical key and payload on the fallback, so the caller only learns which
//! backend served it from the returned URL.

use crate::traits::{Storage, StorageError, StorageResult, StoredObject};
use crate::StorageBackend;
use async_trait::async_trait;
use std::sync::Arc;

pub struct FallbackStorage {
    primary: Arc<dyn Storage>,
    fallback: Arc<dyn Storage>,
}

impl FallbackStorage {
    pub fn new(primary: Arc<dyn Storage>, fallback: Arc<dyn Storage>) -> Self {
        Self { primary, fallback }
    }
}

#[async_trait]
impl Storage for FallbackStorage {
    async fn upload(
        &self,
        storage_key: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> StorageResult<StoredObject> {
        // The payload is needed twice when the primary fails.
        match self
            .primary
            .upload(storage_key, data.clone(), content_type)
            .await
        {
            Ok(stored) => Ok(stored),
            Err(primary_err) => {
                tracing::warn!(
                    error = %primary_err,
                    key = %storage_key,
                    primary = %self.primary.backend_type(),
                    "Primary storage upload failed, falling back to local storage"
                );
                self.fallback
                    .upload(storage_key, data, content_type)
                    .await
                    .map_err(|fallback_err| {
                        tracing::error!(
                            error = %fallback_err,
                            key = %storage_key,
                            "Fallback storage upload failed"
                        );
                        StorageError::UploadFailed(format!(
                            "primary: {}; fallback: {}",
                            primary_err, fallback_err
                        ))
                    })
            }
        }
    }

    async fn download(&self, storage_key: &str) -> StorageResult<Vec<u8>> {
        match self.primary.download(storage_key).await {
            Ok(data) => Ok(data),
            Err(primary_err) => match self.fallback.download(storage_key).await {
                Ok(data) => Ok(data),
                Err(fallback_err) if fallback_err.is_not_found() => Err(primary_err),
                Err(fallback_err) => Err(fallback_err),
            },
        }
    }

    async fn delete(&self, storage_key: &str) -> StorageResult<()> {
        let primary_result = self.primary.delete(storage_key).await;

        let held_locally = self.fallback.exists(storage_key).await.unwrap_or(false);
        let fallback_result = self.fallback.delete(storage_key).await;
        if let Err(ref e) = fallback_result {
            tracing::warn!(error = %e, key = %storage_key, "Fallback storage delete failed");
        }

        match primary_result {
            Ok(()) => Ok(()),
            // Served by the fallback, or already gone.
            Err(e) if e.is_not_found() => Ok(()),
            Err(_) if held_locally && fallback_result.is_ok() => Ok(()),
            Err(e) => Err(e),
        }
    }

    async fn exists(&self, storage_key: &str) -> StorageResult<bool> {
        match self.primary.exists(storage_key).await {
            Ok(true) => Ok(true),
            Ok(false) | Err(_) => self.fallback.exists(storage_key).await,
        }
    }

    fn backend_type(&self) -> StorageBackend {
        self.primary.backend_type()
    }
}
