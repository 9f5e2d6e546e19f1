//! Shared key derivation for stored blobs.

use chrono::{DateTime, Datelike, Utc};
use uuid::Uuid;

/// `images/{YYYY}/{MM}/{DD}/{uuid}{ext}`; `ext` includes the leading dot or is empty.
pub fn derive_image_key(at: DateTime<Utc>, id: Uuid, ext: &str) -> String {
    derive_key("images", at, id, ext)
}

/// `thumbnails/{YYYY}/{MM}/{DD}/{uuid}{ext}`
pub fn derive_thumbnail_key(at: DateTime<Utc>, id: Uuid, ext: &str) -> String {
    derive_key("thumbnails", at, id, ext)
}

fn derive_key(prefix: &str, at: DateTime<Utc>, id: Uuid, ext: &str) -> String {
    format!(
        "{}/{:04}/{:02}/{:02}/{}{}",
        prefix,
        at.year(),
        at.month(),
        at.day(),
        id,
        ext
    )
}
