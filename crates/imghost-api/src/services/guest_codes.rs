//! Guest access code lifecycle
//!
//! Codes are issued by the administrator, redeemed by guests for a token scoped to
//! the synthesized identity `guest:<id>`, and removed either explicitly or by the
//! expiry sweep. Removing a code removes every image attributed to its identity.

use crate::services::images::delete_blobs;
use chrono::{DateTime, Duration, TimeZone, Utc};
use imghost_core::models::{GuestAccessCode, Principal, GUEST_IDENTITY_PREFIX};
use imghost_core::{AppError, Clock};
use imghost_db::{delete_image_record, GuestCodeStore, ImageStore};
use imghost_storage::Storage;
use rand::Rng;
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::watch;

/// No `0/O`, `1/I/L` look-alikes.
pub const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
pub const CODE_LENGTH: usize = 10;
pub const DEFAULT_CODE_LIFETIME_HOURS: i64 = 24;

/// Requested lifetime of a new code.
///
/// Precedence: `permanent`, then `expires_at` (unix seconds), then a positive
/// `days`, then the 24 hour default.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ExpirySpec {
    pub days: Option<i64>,
    pub expires_at: Option<i64>,
    pub permanent: bool,
}

impl ExpirySpec {
    pub fn resolve(&self, now: DateTime<Utc>) -> Result<Option<DateTime<Utc>>, AppError> {
        if self.permanent {
            return Ok(None);
        }

        if let Some(secs) = self.expires_at {
            let at = Utc
                .timestamp_opt(secs, 0)
                .single()
                .ok_or_else(|| AppError::BadRequest("expires_at is out of range".to_string()))?;
            if at <= now {
                return Err(AppError::BadRequest(
                    "expires_at must be in the future".to_string(),
                ));
            }
            return Ok(Some(at));
        }

        match self.days {
            Some(days) if days > 0 => {
                let at = Duration::try_days(days)
                    .and_then(|lifetime| now.checked_add_signed(lifetime))
                    .ok_or_else(|| AppError::BadRequest("days is out of range".to_string()))?;
                Ok(Some(at))
            }
            _ => Ok(Some(now + Duration::hours(DEFAULT_CODE_LIFETIME_HOURS))),
        }
    }
}

fn random_code() -> String {
    let mut rng = rand::rng();
    (0..CODE_LENGTH)
        .map(|_| CODE_ALPHABET[rng.random_range(0..CODE_ALPHABET.len())] as char)
        .collect()
}

pub struct GuestCodeService {
    codes: Arc<dyn GuestCodeStore>,
    images: Arc<dyn ImageStore>,
    storage: Arc<dyn Storage>,
    clock: Arc<dyn Clock>,
    admin: String,
}

impl GuestCodeService {
    pub fn new(
        codes: Arc<dyn GuestCodeStore>,
        images: Arc<dyn ImageStore>,
        storage: Arc<dyn Storage>,
        clock: Arc<dyn Clock>,
        admin: String,
    ) -> Self {
        Self {
            codes,
            images,
            storage,
            clock,
            admin,
        }
    }

    fn require_admin(&self, principal: &Principal) -> Result<(), AppError> {
        if principal.username != self.admin {
            return Err(AppError::Forbidden(
                "Only the administrator can manage guest codes".to_string(),
            ));
        }
        Ok(())
    }

    /// Issue a new code. A collision with an existing code fails the insert; there
    /// is no retry.
    #[tracing::instrument(skip(self, spec), fields(creator = %creator.username))]
    pub async fn generate(
        &self,
        creator: &Principal,
        spec: &ExpirySpec,
    ) -> Result<GuestAccessCode, AppError> {
        self.require_admin(creator)?;
        let expires_at = spec.resolve(self.clock.now())?;

        let code = self
            .codes
            .create(&random_code(), expires_at, &creator.username)
            .await?;

        tracing::info!(code_id = code.id, expires_at = ?code.expires_at, "Guest code created");
        Ok(code)
    }

    /// Guest login. Returns the code so the caller can issue a token for its identity.
    pub async fn redeem(&self, code: &str) -> Result<GuestAccessCode, AppError> {
        let normalized = code.trim().to_ascii_uppercase();
        let found = self
            .codes
            .find_by_code(&normalized)
            .await?
            .ok_or_else(|| AppError::Unauthorized("Invalid code".to_string()))?;

        if found.is_expired(self.clock.now()) {
            return Err(AppError::Unauthorized("Code expired".to_string()));
        }

        tracing::info!(code_id = found.id, "Guest code redeemed");
        Ok(found)
    }

    /// Reject guest principals whose code was deleted or has expired since their
    /// token was issued. Account principals always pass.
    pub async fn ensure_active(&self, principal: &Principal) -> Result<(), AppError> {
        let Some(id) = principal.guest_code_id() else {
            return Ok(());
        };
        match self.codes.find_by_id(id).await? {
            Some(code) if !code.is_expired(self.clock.now()) => Ok(()),
            Some(_) => Err(AppError::Unauthorized("Code expired".to_string())),
            None => Err(AppError::Unauthorized("Invalid code".to_string())),
        }
    }

    pub async fn list(&self, requester: &Principal) -> Result<Vec<GuestAccessCode>, AppError> {
        self.require_admin(requester)?;
        self.codes.list().await
    }

    /// Explicit removal by the administrator. Returns whether anything existed.
    pub async fn delete(&self, requester: &Principal, id: i64) -> Result<bool, AppError> {
        self.require_admin(requester)?;
        self.delete_code_and_cascade(id).await
    }

    /// Delete every image attributed to `guest:<id>`, then the code itself.
    ///
    /// Blob deletion is best-effort. Metadata failures abort before the code row is
    /// removed so the next sweep retries. Calling this again for an already removed
    /// code is a successful no-op.
    #[tracing::instrument(skip(self))]
    pub async fn delete_code_and_cascade(&self, id: i64) -> Result<bool, AppError> {
        let identity = GuestAccessCode::identity_for(id);
        let images = self.images.list_by_uploader(&identity).await?;

        let mut removed_images = 0usize;
        for image in &images {
            if let Err(e) = delete_blobs(self.storage.as_ref(), image).await {
                tracing::warn!(
                    error = %e,
                    image_uuid = %image.uuid,
                    "Guest image blob not removed; deleting record anyway"
                );
            }
            if delete_image_record(self.images.as_ref(), image.uuid).await? {
                removed_images += 1;
            }
        }

        let removed_code = self.codes.delete(id).await?;

        if removed_code || removed_images > 0 {
            tracing::info!(
                code_id = id,
                removed_images,
                removed_code,
                "Guest code and its images deleted"
            );
        }
        Ok(removed_code || removed_images > 0)
    }

    /// Cascade-delete every expired code, then the images of any `guest:<id>`
    /// identity whose code no longer exists. Returns how many codes or orphaned
    /// identities were processed successfully; a failure on one does not stop the
    /// others.
    pub async fn sweep_expired(&self) -> Result<usize, AppError> {
        let now = self.clock.now();
        let expired = self.codes.list_expired(now).await?;

        let mut swept = 0;
        for code in &expired {
            match self.delete_code_and_cascade(code.id).await {
                Ok(_) => swept += 1,
                Err(e) => {
                    tracing::error!(error = %e, code_id = code.id, "Failed to sweep expired guest code");
                }
            }
        }

        let orphans = self.sweep_orphaned_uploads().await?;

        if !expired.is_empty() || orphans > 0 {
            tracing::info!(expired = expired.len(), swept, orphans, "Guest code sweep finished");
        }
        Ok(swept + orphans)
    }

    /// An upload that was admitted just before its code was deleted can land after
    /// the cascade ran. Those images carry a guest identity with no code behind it.
    async fn sweep_orphaned_uploads(&self) -> Result<usize, AppError> {
        let uploaders = self
            .images
            .list_uploaders_with_prefix(GUEST_IDENTITY_PREFIX)
            .await?;

        let mut removed = 0;
        for uploader in &uploaders {
            let Some(id) = Principal::new(uploader.as_str()).guest_code_id() else {
                continue;
            };
            if self.codes.find_by_id(id).await?.is_some() {
                continue;
            }
            match self.delete_code_and_cascade(id).await {
                Ok(_) => {
                    tracing::warn!(uploader = %uploader, "Removed images of a deleted guest code");
                    removed += 1;
                }
                Err(e) => {
                    tracing::error!(error = %e, uploader = %uploader, "Failed to remove orphaned guest images");
                }
            }
        }
        Ok(removed)
    }

    /// Start the periodic expiry sweep. Stops when `shutdown` flips to true or its
    /// sender is dropped.
    pub fn start_sweep(
        self: Arc<Self>,
        period: std::time::Duration,
        mut shutdown: watch::Receiver<bool>,
    ) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker =
                tokio::time::interval_at(tokio::time::Instant::now() + period, period);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        tracing::debug!("Starting scheduled guest code sweep");
                        if let Err(e) = self.sweep_expired().await {
                            tracing::error!(error = %e, "Guest code sweep failed");
                        }
                    }
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            tracing::info!("Guest code sweep stopped");
                            break;
                        }
                    }
                }
            }
        })
    }
}
