//! Read and delete operations on stored images.

use imghost_core::models::{ImageRecord, StatsSummary};
use imghost_core::{AppError, Clock};
use imghost_db::{delete_image_record, ImageStore};
use imghost_storage::{Storage, StorageError};
use std::sync::Arc;
use uuid::Uuid;

pub const DEFAULT_PAGE_SIZE: i64 = 20;
pub const MAX_PAGE_SIZE: i64 = 100;

/// Delete every blob `record` references. Missing blobs count as deleted.
///
/// All keys are attempted; the first failure is returned.
pub async fn delete_blobs(storage: &dyn Storage, record: &ImageRecord) -> Result<(), StorageError> {
    let mut first_error = None;
    for key in record.storage_keys() {
        match storage.delete(key).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {}
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    storage_key = %key,
                    image_uuid = %record.uuid,
                    "Failed to delete blob"
                );
                first_error.get_or_insert(e);
            }
        }
    }
    first_error.map_or(Ok(()), Err)
}

#[derive(Clone)]
pub struct ImageService {
    images: Arc<dyn ImageStore>,
    storage: Arc<dyn Storage>,
    clock: Arc<dyn Clock>,
}

impl ImageService {
    pub fn new(images: Arc<dyn ImageStore>, storage: Arc<dyn Storage>, clock: Arc<dyn Clock>) -> Self {
        Self {
            images,
            storage,
            clock,
        }
    }

    pub async fn get(&self, uuid: Uuid) -> Result<ImageRecord, AppError> {
        self.images
            .find_by_uuid(uuid)
            .await?
            .ok_or_else(|| AppError::NotFound("Image not found".to_string()))
    }

    pub async fn list(&self, limit: Option<i64>, offset: Option<i64>) -> Result<Vec<ImageRecord>, AppError> {
        let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
        let offset = offset.unwrap_or(0).max(0);
        self.images.list(limit, offset).await
    }

    /// Remove the blobs, then the record.
    ///
    /// If a blob cannot be removed the record is kept, so its keys stay reachable
    /// for a retry.
    #[tracing::instrument(skip(self), fields(image_uuid = %uuid))]
    pub async fn delete(&self, uuid: Uuid) -> Result<(), AppError> {
        let record = self.get(uuid).await?;

        delete_blobs(self.storage.as_ref(), &record).await?;
        delete_image_record(self.images.as_ref(), uuid).await?;

        tracing::info!(image_uuid = %uuid, "Image deleted");
        Ok(())
    }

    pub async fn summary(&self) -> Result<StatsSummary, AppError> {
        self.images.summary(self.clock.now().date_naive()).await
    }
}
