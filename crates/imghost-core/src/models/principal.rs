use serde::{Deserialize, Serialize};

use super::guest_code::GUEST_IDENTITY_PREFIX;

/// The authenticated caller, as produced by the auth layer.
///
/// The username is trusted verbatim for attribution: either an account name
/// or a synthesized `guest:<codeID>` identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub username: String,
}

impl Principal {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
        }
    }

    pub fn is_guest(&self) -> bool {
        self.username.starts_with(GUEST_IDENTITY_PREFIX)
    }

    /// The guest code id encoded in a `guest:<id>` identity.
    pub fn guest_code_id(&self) -> Option<i64> {
        self.username
            .strip_prefix(GUEST_IDENTITY_PREFIX)
            .and_then(|id| id.parse().ok())
    }
}
