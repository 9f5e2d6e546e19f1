use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An account that signs in with a password.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    /// Argon2 PHC string. Never serialized into responses.
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
