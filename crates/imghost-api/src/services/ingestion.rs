//! Upload ingestion pipeline
//!
//! Every file walks the same stages:
//!
//! ```text
//! Received -> Validated -> Processed -> Stored -> Persisted
//!                                          \-> Compensating -> Failed
//! ```
//!
//! Nothing is written before `Stored`, so earlier failures need no cleanup. Once
//! blobs are stored, a failed metadata write deletes them again before the error is
//! returned. A failed compensation is logged; it never replaces the original error.
//! A crash between store and compensation can still leave an orphaned blob.

use chrono::{DateTime, Utc};
use imghost_core::models::{ImageRecord, NewImageRecord};
use imghost_core::{AppError, Clock, ErrorMetadata};
use imghost_db::{ImageStore, StatsStore};
use imghost_processing::{ImageProcessor, MediaValidator, ProcessedImage};
use imghost_storage::{derive_image_key, derive_thumbnail_key, Storage};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

pub const MAX_BATCH_FILES: usize = 10;

/// One file as received from the client.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub filename: String,
    /// Declared by the client; never sniffed.
    pub content_type: String,
    pub data: Vec<u8>,
}

/// Who uploaded, and from where.
#[derive(Debug, Clone)]
pub struct UploadContext {
    /// Account username or `guest:<codeID>`, trusted verbatim.
    pub uploaded_by: String,
    pub client_ip: Option<String>,
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadStage {
    Received,
    Validated,
    Processed,
    Stored,
    Persisted,
    Compensating,
    Failed,
}

impl fmt::Display for UploadStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            UploadStage::Received => "received",
            UploadStage::Validated => "validated",
            UploadStage::Processed => "processed",
            UploadStage::Stored => "stored",
            UploadStage::Persisted => "persisted",
            UploadStage::Compensating => "compensating",
            UploadStage::Failed => "failed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchFailure {
    pub index: usize,
    pub filename: String,
    pub error: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchUploadResult {
    pub successful: usize,
    pub failed: usize,
    pub results: Vec<ImageRecord>,
    pub errors: Vec<BatchFailure>,
}

/// Bytes chosen for storage plus how to label them.
struct Payload {
    data: Vec<u8>,
    mime_type: String,
    extension: String,
}

pub struct IngestionPipeline {
    validator: MediaValidator,
    processor: ImageProcessor,
    storage: Arc<dyn Storage>,
    images: Arc<dyn ImageStore>,
    stats: Arc<dyn StatsStore>,
    clock: Arc<dyn Clock>,
}

fn log_stage(filename: &str, stage: UploadStage) {
    tracing::debug!(filename = %filename, stage = %stage, "Upload stage reached");
}

impl IngestionPipeline {
    pub fn new(
        validator: MediaValidator,
        processor: ImageProcessor,
        storage: Arc<dyn Storage>,
        images: Arc<dyn ImageStore>,
        stats: Arc<dyn StatsStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            validator,
            processor,
            storage,
            images,
            stats,
            clock,
        }
    }

    /// Run one file through the whole pipeline.
    #[tracing::instrument(
        skip(self, file, ctx),
        fields(filename = %file.filename, uploaded_by = %ctx.uploaded_by)
    )]
    pub async fn upload_one(
        &self,
        file: UploadedFile,
        ctx: &UploadContext,
    ) -> Result<ImageRecord, AppError> {
        let filename = file.filename.clone();
        let result = self.run(file, ctx).await;
        if let Err(ref e) = result {
            tracing::debug!(
                filename = %filename,
                stage = %UploadStage::Failed,
                error = %e,
                "Upload stage reached"
            );
        }
        result
    }

    async fn run(&self, file: UploadedFile, ctx: &UploadContext) -> Result<ImageRecord, AppError> {
        let start = std::time::Instant::now();
        let UploadedFile {
            filename,
            content_type,
            data,
        } = file;
        log_stage(&filename, UploadStage::Received);

        let declared_size = data.len();
        self.validator.validate(declared_size, &content_type)?;
        log_stage(&filename, UploadStage::Validated);

        let (data, processed) = self.process(data).await?;
        log_stage(&filename, UploadStage::Processed);

        let id = Uuid::new_v4();
        let now = self.clock.now();
        let payload = Self::select_payload(data, &processed);

        let stored = self.store(id, now, payload, &processed).await?;
        log_stage(&filename, UploadStage::Stored);

        let record = NewImageRecord {
            uuid: id,
            original_name: filename.clone(),
            file_size: declared_size as i64,
            mime_type: stored.mime_type,
            width: processed.width as i32,
            height: processed.height as i32,
            storage_key: stored.key.clone(),
            public_url: stored.url,
            thumbnail_key: Some(stored.thumbnail_key.clone()),
            thumbnail_url: Some(stored.thumbnail_url),
            upload_ip: ctx.client_ip.clone(),
            user_agent: ctx.user_agent.clone(),
            uploaded_by: ctx.uploaded_by.clone(),
        };

        let image = match self.images.create(record).await {
            Ok(image) => image,
            Err(e) => {
                log_stage(&filename, UploadStage::Compensating);
                self.compensate(&[stored.key.as_str(), stored.thumbnail_key.as_str()])
                    .await;
                return Err(e);
            }
        };
        log_stage(&filename, UploadStage::Persisted);

        self.record_stats(now, declared_size as i64);

        tracing::info!(
            image_uuid = %image.uuid,
            storage_key = %image.storage_key,
            file_size = image.file_size,
            width = image.width,
            height = image.height,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Image uploaded"
        );

        Ok(image)
    }

    /// Run every file independently. Only an empty or oversized batch fails as a whole.
    #[tracing::instrument(skip(self, files, ctx), fields(files = files.len(), uploaded_by = %ctx.uploaded_by))]
    pub async fn upload_batch(
        &self,
        files: Vec<UploadedFile>,
        ctx: &UploadContext,
    ) -> Result<BatchUploadResult, AppError> {
        if files.is_empty() {
            return Err(AppError::BadRequest("No files provided".to_string()));
        }
        if files.len() > MAX_BATCH_FILES {
            return Err(AppError::BadRequest(format!(
                "Too many files: at most {} per batch",
                MAX_BATCH_FILES
            )));
        }

        let mut results = Vec::with_capacity(files.len());
        let mut errors = Vec::new();

        for (index, file) in files.into_iter().enumerate() {
            let filename = file.filename.clone();
            match self.upload_one(file, ctx).await {
                Ok(image) => results.push(image),
                Err(e) => errors.push(BatchFailure {
                    index,
                    filename,
                    error: e.client_message(),
                }),
            }
        }

        tracing::info!(
            successful = results.len(),
            failed = errors.len(),
            "Batch upload finished"
        );

        Ok(BatchUploadResult {
            successful: results.len(),
            failed: errors.len(),
            results,
            errors,
        })
    }

    /// Decode on the blocking pool. Hands the input bytes back for storage.
    async fn process(&self, data: Vec<u8>) -> Result<(Vec<u8>, ProcessedImage), AppError> {
        let processor = self.processor.clone();
        let (data, result) = tokio::task::spawn_blocking(move || {
            let result = processor.process(&data);
            (data, result)
        })
        .await
        .map_err(|e| AppError::Internal(format!("Image processing task failed: {}", e)))?;

        Ok((data, result?))
    }

    /// The recompressed variant when it is smaller, otherwise the bytes as uploaded.
    fn select_payload(data: Vec<u8>, processed: &ProcessedImage) -> Payload {
        match processed.smaller_variant(data.len()) {
            Some(variant) => Payload {
                data: variant.data.clone(),
                mime_type: variant.mime_type().to_string(),
                extension: variant.extension().to_string(),
            },
            None => Payload {
                data,
                mime_type: processed.mime_type.clone(),
                extension: processed.original_extension(),
            },
        }
    }

    async fn store(
        &self,
        id: Uuid,
        at: DateTime<Utc>,
        payload: Payload,
        processed: &ProcessedImage,
    ) -> Result<StoredImage, AppError> {
        let key = derive_image_key(at, id, &payload.extension);
        let stored = self
            .storage
            .upload(&key, payload.data, &payload.mime_type)
            .await?;

        let thumbnail = &processed.thumbnail;
        let thumbnail_key = derive_thumbnail_key(at, id, thumbnail.extension());
        let stored_thumbnail = match self
            .storage
            .upload(&thumbnail_key, thumbnail.data.clone(), thumbnail.mime_type())
            .await
        {
            Ok(thumb) => thumb,
            Err(e) => {
                self.compensate(&[stored.key.as_str()]).await;
                return Err(e.into());
            }
        };

        Ok(StoredImage {
            key: stored.key,
            url: stored.url,
            mime_type: payload.mime_type,
            thumbnail_key: stored_thumbnail.key,
            thumbnail_url: stored_thumbnail.url,
        })
    }

    /// Best-effort removal of blobs written for a failed upload.
    async fn compensate(&self, keys: &[&str]) {
        for key in keys {
            match self.storage.delete(key).await {
                Ok(()) => {
                    tracing::info!(storage_key = %key, "Compensated stored blob");
                }
                Err(e) => {
                    tracing::error!(
                        error = %e,
                        storage_key = %key,
                        "Failed to delete blob during compensation; blob is orphaned"
                    );
                }
            }
        }
    }

    /// Detached: the response never waits on the stats upsert.
    fn record_stats(&self, at: DateTime<Utc>, bytes: i64) {
        let stats = self.stats.clone();
        let date = at.date_naive();
        tokio::spawn(async move {
            if let Err(e) = stats.record_upload(date, bytes).await {
                tracing::warn!(error = %e, %date, "Failed to update daily stats");
            }
        });
    }
}

struct StoredImage {
    key: String,
    url: String,
    mime_type: String,
    thumbnail_key: String,
    thumbnail_url: String,
}
