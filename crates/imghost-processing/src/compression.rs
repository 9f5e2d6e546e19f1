use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{DynamicImage, ImageFormat};
use std::io::Cursor;

/// Output encodings produced for stored variants
///
/// PNG input stays lossless; every other input (including formats we cannot
/// encode back, such as GIF and WebP) is re-encoded as JPEG.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Jpeg,
    Png,
}

impl OutputFormat {
    /// Pick the output encoding for a decoded input format.
    pub fn for_input(format: Option<ImageFormat>) -> Self {
        match format {
            Some(ImageFormat::Png) => OutputFormat::Png,
            _ => OutputFormat::Jpeg,
        }
    }

    pub fn to_mime_type(self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "image/jpeg",
            OutputFormat::Png => "image/png",
        }
    }

    /// File extension including the leading dot.
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Jpeg => ".jpg",
            OutputFormat::Png => ".png",
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("failed to encode {format:?}: {message}")]
pub struct EncodeError {
    pub format: OutputFormat,
    pub message: String,
}

pub struct ImageCompressor;

impl ImageCompressor {
    /// Encode `img` in `format`. `quality` applies to JPEG only.
    ///
    /// `max_lossless` selects the best (slowest) PNG compression level; otherwise
    /// the encoder default is used.
    pub fn encode(
        img: &DynamicImage,
        format: OutputFormat,
        quality: u8,
        max_lossless: bool,
    ) -> Result<Vec<u8>, EncodeError> {
        let result = match format {
            OutputFormat::Jpeg => Self::compress_jpeg(img, quality),
            OutputFormat::Png => Self::compress_png(img, max_lossless),
        };
        result.map_err(|message| EncodeError { format, message })
    }

    /// Compress to JPEG with mozjpeg
    fn compress_jpeg(img: &DynamicImage, quality: u8) -> Result<Vec<u8>, String> {
        let rgb_img = img.to_rgb8();
        let (width, height) = rgb_img.dimensions();

        let mut comp = mozjpeg::Compress::new(mozjpeg::ColorSpace::JCS_RGB);
        comp.set_size(width as usize, height as usize);
        comp.set_quality(quality.clamp(1, 100) as f32);
        comp.set_optimize_coding(true);

        let mut comp = comp.start_compress(Vec::new()).map_err(|e| e.to_string())?;
        comp.write_scanlines(&rgb_img).map_err(|e| e.to_string())?;
        comp.finish().map_err(|e| e.to_string())
    }

    /// Compress to PNG
    fn compress_png(img: &DynamicImage, max_lossless: bool) -> Result<Vec<u8>, String> {
        let mut buffer = Vec::new();

        if max_lossless {
            let encoder = PngEncoder::new_with_quality(
                Cursor::new(&mut buffer),
                CompressionType::Best,
                FilterType::Adaptive,
            );
            img.write_with_encoder(encoder).map_err(|e| e.to_string())?;
        } else {
            img.write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
                .map_err(|e| e.to_string())?;
        }

        Ok(buffer)
    }
}
