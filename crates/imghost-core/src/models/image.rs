use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A persisted image.
///
/// Only created after both the blob write and the metadata write succeeded.
/// `deleted_at` is the tombstone set by the first phase of a delete.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRecord {
    pub id: i64,
    pub uuid: Uuid,
    pub original_name: String,
    pub file_size: i64,
    pub mime_type: String,
    pub width: i32,
    pub height: i32,
    pub storage_key: String,
    pub public_url: String,
    pub thumbnail_key: Option<String>,
    pub thumbnail_url: Option<String>,
    pub upload_ip: Option<String>,
    pub user_agent: Option<String>,
    pub uploaded_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl ImageRecord {
    /// Every blob key this record references.
    pub fn storage_keys(&self) -> Vec<&str> {
        let mut keys = vec![self.storage_key.as_str()];
        if let Some(ref thumb) = self.thumbnail_key {
            keys.push(thumb.as_str());
        }
        keys
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// Insert payload for a new image record.
#[derive(Debug, Clone, PartialEq)]
pub struct NewImageRecord {
    pub uuid: Uuid,
    pub original_name: String,
    pub file_size: i64,
    pub mime_type: String,
    pub width: i32,
    pub height: i32,
    pub storage_key: String,
    pub public_url: String,
    pub thumbnail_key: Option<String>,
    pub thumbnail_url: Option<String>,
    pub upload_ip: Option<String>,
    pub user_agent: Option<String>,
    pub uploaded_by: String,
}
