use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Prefix of the identity synthesized for a redeemed guest code (`guest:<id>`).
pub const GUEST_IDENTITY_PREFIX: &str = "guest:";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuestAccessCode {
    pub id: i64,
    pub code: String,
    /// `None` means the code never expires.
    pub expires_at: Option<DateTime<Utc>>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl GuestAccessCode {
    /// The uploader identity attributed to images uploaded with this code.
    pub fn identity(&self) -> String {
        Self::identity_for(self.id)
    }

    pub fn identity_for(id: i64) -> String {
        format!("{}{}", GUEST_IDENTITY_PREFIX, id)
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        matches!(self.expires_at, Some(expires_at) if expires_at < now)
    }
}
