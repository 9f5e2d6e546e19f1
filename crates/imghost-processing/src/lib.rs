//! imghost Processing Library
//!
//! Upload validation and image processing: declared size/type checks, decoding,
//! recompression of large uploads and thumbnail generation.

pub mod validator;

#[cfg(feature = "image")]
pub mod compression;
#[cfg(feature = "image")]
pub mod processor;

pub use validator::{MediaValidator, ValidationError};

#[cfg(feature = "image")]
pub use compression::{ImageCompressor, OutputFormat};
#[cfg(feature = "image")]
pub use processor::{EncodedImage, ImageProcessor, ProcessedImage, ProcessingError};
