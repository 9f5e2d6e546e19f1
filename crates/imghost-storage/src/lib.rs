//! imghost Storage Library
//!
//! Byte storage behind a uniform key/URL interface. Includes the [`Storage`] trait,
//! S3-compatible and local filesystem backends, and [`FallbackStorage`], which
//! composes a remote primary with a local-disk fallback.
//!
//! # Storage key format
//!
//! Keys are date-partitioned and derived by the caller, never by a backend, so the
//! layout stays identical whichever backend ends up holding the bytes:
//!
//! - **Images**: `images/{YYYY}/{MM}/{DD}/{uuid}{ext}`
//! - **Thumbnails**: `thumbnails/{YYYY}/{MM}/{DD}/{uuid}{ext}`
//!
//! Keys must not contain `..` or a leading `/`.

pub mod factory;
pub mod fallback;
pub mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

// Re-export commonly used types
pub use factory::create_storage;
pub use fallback::FallbackStorage;
pub use imghost_core::StorageBackend;
pub use keys::{derive_image_key, derive_thumbnail_key};
#[cfg(feature = "storage-local")]
pub use local::{LocalStorage, LOCAL_URL_PREFIX};
#[cfg(feature = "storage-s3")]
pub use s3::S3Storage;
pub use traits::{Storage, StorageError, StorageResult, StoredObject};
