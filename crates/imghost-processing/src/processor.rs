//! Image processor - decode, measure, recompress and thumbnail

use crate::compression::{ImageCompressor, OutputFormat};
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageFormat, ImageReader};
use imghost_core::AppError;
use std::io::Cursor;

/// Inputs larger than this are recompressed.
pub const COMPRESS_THRESHOLD_BYTES: usize = 1024 * 1024;
pub const COMPRESS_QUALITY: u8 = 85;
pub const THUMBNAIL_MAX_DIMENSION: u32 = 300;
pub const THUMBNAIL_QUALITY: u8 = 80;

#[derive(Debug, thiserror::Error)]
pub enum ProcessingError {
    #[error("failed to decode image: {0}")]
    Decode(String),

    #[error(transparent)]
    Encode(#[from] crate::compression::EncodeError),
}

impl From<ProcessingError> for AppError {
    fn from(err: ProcessingError) -> Self {
        AppError::Processing(err.to_string())
    }
}

/// Bytes produced by an encoder, tagged with their format.
#[derive(Debug, Clone)]
pub struct EncodedImage {
    pub data: Vec<u8>,
    pub format: OutputFormat,
}

impl EncodedImage {
    pub fn mime_type(&self) -> &'static str {
        self.format.to_mime_type()
    }

    pub fn extension(&self) -> &'static str {
        self.format.extension()
    }
}

/// Result of processing one upload
#[derive(Debug, Clone)]
pub struct ProcessedImage {
    pub width: u32,
    pub height: u32,
    /// Format detected from the bytes.
    pub format: ImageFormat,
    /// MIME type of the detected format.
    pub mime_type: String,
    /// Recompressed variant; only produced for inputs above the threshold.
    pub compressed: Option<EncodedImage>,
    pub thumbnail: EncodedImage,
}

impl ProcessedImage {
    /// The recompressed variant when it is actually smaller than `original_len`.
    pub fn smaller_variant(&self, original_len: usize) -> Option<&EncodedImage> {
        self.compressed
            .as_ref()
            .filter(|variant| variant.data.len() < original_len)
    }

    /// Extension (with leading dot) of the detected input format.
    pub fn original_extension(&self) -> String {
        self.format
            .extensions_str()
            .first()
            .map(|ext| format!(".{}", ext))
            .unwrap_or_default()
    }
}

/// Decodes uploads and derives the stored variants.
///
/// All work is synchronous and CPU bound; async callers should run it on the
/// blocking pool.
#[derive(Debug, Clone)]
pub struct ImageProcessor {
    compress_threshold: usize,
    compress_quality: u8,
    thumbnail_max: u32,
    thumbnail_quality: u8,
}

impl Default for ImageProcessor {
    fn default() -> Self {
        Self {
            compress_threshold: COMPRESS_THRESHOLD_BYTES,
            compress_quality: COMPRESS_QUALITY,
            thumbnail_max: THUMBNAIL_MAX_DIMENSION,
            thumbnail_quality: THUMBNAIL_QUALITY,
        }
    }
}

impl ImageProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode `data` and produce dimensions, an optional recompressed variant and
    /// a thumbnail. Any encode failure fails the whole call.
    pub fn process(&self, data: &[u8]) -> Result<ProcessedImage, ProcessingError> {
        let start = std::time::Instant::now();

        let reader = ImageReader::new(Cursor::new(data))
            .with_guessed_format()
            .map_err(|e| ProcessingError::Decode(e.to_string()))?;
        let format = reader
            .format()
            .ok_or_else(|| ProcessingError::Decode("unrecognized image format".to_string()))?;
        let img = reader
            .decode()
            .map_err(|e| ProcessingError::Decode(e.to_string()))?;

        let (width, height) = img.dimensions();
        let output = OutputFormat::for_input(Some(format));

        let compressed = if data.len() > self.compress_threshold {
            let bytes = ImageCompressor::encode(&img, output, self.compress_quality, true)?;
            Some(EncodedImage {
                data: bytes,
                format: output,
            })
        } else {
            None
        };

        let thumbnail = self.thumbnail(&img, output)?;

        tracing::debug!(
            width,
            height,
            format = ?format,
            input_bytes = data.len(),
            compressed_bytes = ?compressed.as_ref().map(|c| c.data.len()),
            thumbnail_bytes = thumbnail.data.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Image processed"
        );

        Ok(ProcessedImage {
            width,
            height,
            format,
            mime_type: format.to_mime_type().to_string(),
            compressed,
            thumbnail,
        })
    }

    /// Fit within `thumbnail_max` on both sides, keeping aspect ratio; never upscale.
    fn thumbnail(
        &self,
        img: &DynamicImage,
        output: OutputFormat,
    ) -> Result<EncodedImage, ProcessingError> {
        let (width, height) = img.dimensions();
        let fitted;
        let source = if width > self.thumbnail_max || height > self.thumbnail_max {
            fitted = img.resize(self.thumbnail_max, self.thumbnail_max, FilterType::Lanczos3);
            &fitted
        } else {
            img
        };

        let data = ImageCompressor::encode(source, output, self.thumbnail_quality, false)?;
        Ok(EncodedImage {
            data,
            format: output,
        })
    }
}
